use geofill_runtime::{FieldName, ModelJsonError, SettingsIssue};
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::net::{AiError, NetError};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum GeofillError {
    #[error("network error: {0}")]
    Network(#[from] NetError),
    #[error("API Error ({status}): {body}...")]
    Api { status: u16, body: String },
    #[error("{0}")]
    Format(String),
    #[error("{0}")]
    Parse(#[from] ModelJsonError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("{0} 已锁定")]
    Locked(FieldName),
}

impl GeofillError {
    pub fn validation(message: impl Into<String>) -> Self {
        GeofillError::Validation(message.into())
    }
}

impl From<AiError> for GeofillError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Api { status, body } => GeofillError::Api { status, body },
            AiError::Format { .. } | AiError::EmptyChoices => GeofillError::Format(err.to_string()),
            AiError::Parse(source) => GeofillError::Parse(source),
            AiError::Transport(source) => GeofillError::Network(source),
            AiError::MissingKey => GeofillError::Validation(err.to_string()),
        }
    }
}

impl From<Vec<SettingsIssue>> for GeofillError {
    fn from(issues: Vec<SettingsIssue>) -> Self {
        let joined = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        GeofillError::Validation(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_errors_map_onto_the_taxonomy() {
        let api: GeofillError = AiError::Api {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert_eq!(api.to_string(), "API Error (500): boom...");

        let missing: GeofillError = AiError::MissingKey.into();
        assert!(matches!(missing, GeofillError::Validation(ref message) if message == "请输入 API Key"));

        let format: GeofillError = AiError::Format {
            preview: "<html>".into(),
        }
        .into();
        assert!(matches!(format, GeofillError::Format(ref message) if message.contains("<html>")));
    }
}
