use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const MIN_PASSWORD_LENGTH: u32 = 4;
pub const MAX_PASSWORD_LENGTH: u32 = 128;

/// User-configured generation and AI parameters.
///
/// Missing keys in stored JSON fall back to the defaults, so older stores
/// merge cleanly over new fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "enableAI")]
    pub enable_ai: bool,
    pub openai_base_url: String,
    pub openai_key: String,
    pub openai_model: String,
    pub ai_persona: String,
    pub password_length: u32,
    pub pwd_uppercase: bool,
    pub pwd_lowercase: bool,
    pub pwd_numbers: bool,
    pub pwd_symbols: bool,
    pub min_age: u32,
    pub max_age: u32,
    pub auto_clear_data: bool,
    pub geoapify_key: String,
    pub use_address_api: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_ai: false,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_key: String::new(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            ai_persona: String::new(),
            password_length: 12,
            pwd_uppercase: true,
            pwd_lowercase: true,
            pwd_numbers: true,
            pwd_symbols: true,
            min_age: 18,
            max_age: 55,
            auto_clear_data: false,
            geoapify_key: String::new(),
            use_address_api: true,
        }
    }
}

/// A single reason a settings object was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    PasswordLength(u32),
    AgeRange { min: u32, max: u32 },
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::PasswordLength(len) => write!(
                f,
                "password length {len} outside {MIN_PASSWORD_LENGTH}..={MAX_PASSWORD_LENGTH}"
            ),
            SettingsIssue::AgeRange { min, max } => {
                write!(f, "minimum age {min} exceeds maximum age {max}")
            }
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Vec<SettingsIssue>> {
        let mut issues = Vec::new();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&self.password_length) {
            issues.push(SettingsIssue::PasswordLength(self.password_length));
        }
        if self.min_age > self.max_age {
            issues.push(SettingsIssue::AgeRange {
                min: self.min_age,
                max: self.max_age,
            });
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// The AI paths need both the feature switch and a key.
    pub fn ai_ready(&self) -> bool {
        self.enable_ai && !self.openai_key.trim().is_empty()
    }

    pub fn schema_json() -> serde_json::Value {
        let schema = schemars::schema_for!(Settings);
        serde_json::to_value(schema).unwrap_or_default()
    }
}

/// How the email domain is chosen.
///
/// Persisted as the raw select value: a domain such as
/// `gmail.com`, or the markers `custom` and `temp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmailDomainMode {
    Fixed(String),
    Custom,
    Temp,
}

impl EmailDomainMode {
    /// The domain forced onto `{username}@{domain}` after generation, if any.
    pub fn fixed_domain(&self) -> Option<&str> {
        match self {
            EmailDomainMode::Fixed(domain) => Some(domain.as_str()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EmailDomainMode::Fixed(domain) => domain,
            EmailDomainMode::Custom => "custom",
            EmailDomainMode::Temp => "temp",
        }
    }
}

impl Default for EmailDomainMode {
    fn default() -> Self {
        EmailDomainMode::Fixed("gmail.com".to_string())
    }
}

impl From<String> for EmailDomainMode {
    fn from(value: String) -> Self {
        match value.trim() {
            "custom" => EmailDomainMode::Custom,
            "temp" => EmailDomainMode::Temp,
            "" => EmailDomainMode::default(),
            domain => EmailDomainMode::Fixed(domain.trim_start_matches('@').to_string()),
        }
    }
}

impl From<EmailDomainMode> for String {
    fn from(value: EmailDomainMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EmailDomainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_merge_over_defaults() {
        let stored = serde_json::json!({ "enableAI": true, "passwordLength": 20 });
        let settings: Settings = serde_json::from_value(stored).unwrap();
        assert!(settings.enable_ai);
        assert_eq!(settings.password_length, 20);
        assert_eq!(settings.openai_model, DEFAULT_OPENAI_MODEL);
        assert!(settings.pwd_symbols);
        assert!(settings.use_address_api);
    }

    #[test]
    fn settings_serialize_with_store_key_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value.get("enableAI").is_some());
        assert!(value.get("openaiBaseUrl").is_some());
        assert!(value.get("pwdUppercase").is_some());
    }

    #[test]
    fn validation_reports_every_issue() {
        let settings = Settings {
            password_length: 2,
            min_age: 60,
            max_age: 20,
            ..Settings::default()
        };
        let issues = settings.validate().unwrap_err();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn email_modes_round_trip_through_plain_strings() {
        let mode: EmailDomainMode = serde_json::from_str("\"outlook.com\"").unwrap();
        assert_eq!(mode.fixed_domain(), Some("outlook.com"));
        let temp: EmailDomainMode = serde_json::from_str("\"temp\"").unwrap();
        assert_eq!(temp, EmailDomainMode::Temp);
        assert_eq!(serde_json::to_string(&EmailDomainMode::Custom).unwrap(), "\"custom\"");
    }
}
