use std::{env, path::PathBuf};

pub const DEFAULT_STORE_PATH: &str = "geofill_store.json";
pub const DEFAULT_PAGE_ENDPOINT: &str = "127.0.0.1:41100";

/// Process-level configuration. User-editable settings live in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub locales_path: Option<PathBuf>,
    pub page_endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            locales_path: None,
            page_endpoint: DEFAULT_PAGE_ENDPOINT.to_string(),
        }
    }
}

impl AppConfig {
    /// Read `GEOFILL_STORE_PATH`, `GEOFILL_LOCALES_PATH` and
    /// `GEOFILL_PAGE_ENDPOINT`; unset or empty variables keep the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            store_path: read("GEOFILL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            locales_path: read("GEOFILL_LOCALES_PATH").map(PathBuf::from),
            page_endpoint: read("GEOFILL_PAGE_ENDPOINT").unwrap_or(defaults.page_endpoint),
        }
    }

    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.store_path = path;
        }
        self
    }

    pub fn with_page_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.page_endpoint = endpoint;
        }
        self
    }
}
