//! Fallback extraction of a JSON object from free-form model output.
//!
//! Models wrap answers in Markdown fences or chatter around them. The parser
//! strips fences and then takes the span from the first `{` to the last `}`;
//! it does not validate any schema beyond "is a JSON object".

use serde_json::{Map, Value};
use thiserror::Error;

use crate::Profile;

#[derive(Debug, Error)]
pub enum ModelJsonError {
    #[error("no JSON object found in model output")]
    NoObject,
    #[error("model output is not valid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("model output is JSON but not an object")]
    NotAnObject,
}

fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn extract_model_json(raw: &str) -> Result<Map<String, Value>, ModelJsonError> {
    let stripped = strip_fences(raw);
    let span = object_span(&stripped).ok_or(ModelJsonError::NoObject)?;
    match serde_json::from_str::<Value>(span)? {
        Value::Object(map) => Ok(map),
        _ => Err(ModelJsonError::NotAnObject),
    }
}

/// Extract a partial profile from model output; non-canonical keys are dropped.
pub fn parse_model_json(raw: &str) -> Result<Profile, ModelJsonError> {
    let object = extract_model_json(raw)?;
    Ok(Profile::from_json_object(&object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldName;

    #[test]
    fn fenced_output_is_unwrapped() {
        let raw = "```json\n{\"firstName\": \"Taro\", \"city\": \"Osaka\"}\n```";
        let profile = parse_model_json(raw).unwrap();
        assert_eq!(profile.get(FieldName::FirstName), "Taro");
        assert_eq!(profile.get(FieldName::City), "Osaka");
    }

    #[test]
    fn chatter_around_the_object_is_ignored() {
        let raw = "Sure! Here is the profile: {\"lastName\": \"Sato\"} Let me know.";
        let profile = parse_model_json(raw).unwrap();
        assert_eq!(profile.get(FieldName::LastName), "Sato");
    }

    #[test]
    fn greedy_span_keeps_nested_objects() {
        let raw = "{\"a\": {\"b\": 1}, \"email\": \"x@y.z\"}";
        let map = extract_model_json(raw).unwrap();
        assert!(map["a"].is_object());
        assert_eq!(map["email"], "x@y.z");
    }

    #[test]
    fn missing_object_is_reported() {
        assert!(matches!(
            extract_model_json("I cannot help with that."),
            Err(ModelJsonError::NoObject)
        ));
    }

    #[test]
    fn malformed_object_is_reported() {
        assert!(matches!(
            extract_model_json("{\"firstName\": }"),
            Err(ModelJsonError::Invalid(_))
        ));
    }
}
