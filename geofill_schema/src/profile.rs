use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The canonical profile fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    FirstName,
    LastName,
    Gender,
    Birthday,
    Username,
    Email,
    Password,
    Phone,
    Address,
    City,
    State,
    ZipCode,
    Country,
}

impl FieldName {
    pub const ALL: [FieldName; 13] = [
        FieldName::FirstName,
        FieldName::LastName,
        FieldName::Gender,
        FieldName::Birthday,
        FieldName::Username,
        FieldName::Email,
        FieldName::Password,
        FieldName::Phone,
        FieldName::Address,
        FieldName::City,
        FieldName::State,
        FieldName::ZipCode,
        FieldName::Country,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::FirstName => "firstName",
            FieldName::LastName => "lastName",
            FieldName::Gender => "gender",
            FieldName::Birthday => "birthday",
            FieldName::Username => "username",
            FieldName::Email => "email",
            FieldName::Password => "password",
            FieldName::Phone => "phone",
            FieldName::Address => "address",
            FieldName::City => "city",
            FieldName::State => "state",
            FieldName::ZipCode => "zipCode",
            FieldName::Country => "country",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile field '{0}'")]
pub struct ParseFieldNameError(pub String);

impl FromStr for FieldName {
    type Err = ParseFieldNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let field = match lowered.as_str() {
            "zip" | "zipcode" | "postal" => FieldName::ZipCode,
            "first" | "firstname" => FieldName::FirstName,
            "last" | "lastname" => FieldName::LastName,
            other => FieldName::ALL
                .into_iter()
                .find(|field| field.as_str().eq_ignore_ascii_case(other))
                .ok_or_else(|| ParseFieldNameError(s.to_string()))?,
        };
        Ok(field)
    }
}

/// A synthetic identity: field name to string value.
///
/// Absent fields read as empty strings through [`Profile::get`]; use
/// [`Profile::value`] when the difference between "absent" and "empty"
/// matters (lock snapshots do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    fields: BTreeMap<FieldName, String>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FieldName) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn value(&self, field: FieldName) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn with(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: FieldName) -> Option<String> {
        self.fields.remove(&field)
    }

    /// Overlay every field present in `incoming` on top of `self`.
    pub fn merge(&mut self, incoming: &Profile) {
        for (field, value) in &incoming.fields {
            self.fields.insert(*field, value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Build a profile from a loose JSON object, keeping canonical keys only.
    ///
    /// Strings are taken as-is; numbers and booleans are rendered with their
    /// JSON text. Nulls, arrays and nested objects are dropped.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut profile = Profile::new();
        for (key, value) in object {
            let Ok(field) = key.parse::<FieldName>() else {
                continue;
            };
            // Only exact camelCase keys count; aliases are for command input.
            if field.as_str() != key {
                continue;
            }
            match value {
                Value::String(text) => profile.set(field, text.clone()),
                Value::Number(number) => profile.set(field, number.to_string()),
                Value::Bool(flag) => profile.set(field, flag.to_string()),
                _ => {}
            }
        }
        profile
    }
}

impl FromIterator<(FieldName, String)> for Profile {
    fn from_iter<T: IntoIterator<Item = (FieldName, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        Ok(Profile::from_json_object(&object))
    }
}

/// Country/city/region context that drives locale-specific generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleContext {
    pub country: String,
    pub city: String,
    pub region: String,
}

impl LocaleContext {
    pub fn new(
        country: impl Into<String>,
        city: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
            region: region.into(),
        }
    }

    pub fn country_or_default(&self) -> &str {
        if self.country.is_empty() {
            crate::DEFAULT_COUNTRY
        } else {
            &self.country
        }
    }
}
