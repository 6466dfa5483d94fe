use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EmailDomainMode, LocaleContext, Profile, CACHE_VERSION};

/// Last-session state, restored on start-up when the version matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProfile {
    pub version: String,
    #[serde(default)]
    pub current_data: Profile,
    #[serde(default)]
    pub ip_data: LocaleContext,
    #[serde(default)]
    pub email_domain: Option<EmailDomainMode>,
    #[serde(default)]
    pub custom_domain: Option<String>,
}

impl CachedProfile {
    pub fn new(
        current_data: Profile,
        ip_data: LocaleContext,
        email_domain: EmailDomainMode,
        custom_domain: Option<String>,
    ) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            current_data,
            ip_data,
            email_domain: Some(email_domain),
            custom_domain,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == CACHE_VERSION
    }
}

/// A user-named snapshot. Names are unique within the archive list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Profile,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// One automatically recorded fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub data: Profile,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}
