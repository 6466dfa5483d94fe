//! Data contracts shared by every GeoFill crate.
//!
//! Everything here is plain serde data with camelCase JSON keys. The shapes
//! are the persisted store layout, so renaming a field breaks existing stores.

mod page;
mod profile;
mod records;
mod settings;

pub use page::{FormField, FormScanResult, PageContext, PageMessage, SmartFillMapping};
pub use profile::{FieldName, LocaleContext, ParseFieldNameError, Profile};
pub use records::{ArchiveEntry, CachedProfile, HistoryItem, Theme};
pub use settings::{EmailDomainMode, Settings, SettingsIssue};

/// Version tag stamped on the cached profile; any other value invalidates the cache.
pub const CACHE_VERSION: &str = "v3";

/// Upper bound on retained history entries.
pub const MAX_HISTORY_ITEMS: usize = 10;

/// Locale used when every geolocation provider fails.
pub const DEFAULT_COUNTRY: &str = "United States";
pub const DEFAULT_CITY: &str = "New York";

/// Key names inside the key-value store.
pub mod keys {
    pub const CACHED_PROFILE: &str = "geoFillCachedData";
    pub const THEME: &str = "geoFillTheme";
    pub const LOCKED_FIELDS: &str = "geoFillLockedFields";
    pub const SETTINGS: &str = "geoFillSettings";
    pub const ARCHIVES: &str = "geoFillArchives";
    pub const AUTO_CLEAR: &str = "geoFillAutoClear";
    pub const HISTORY: &str = "geoFillHistory";
    pub const GEOAPIFY_KEY: &str = "geoFillGeoapifyKey";
    pub const USE_AI: &str = "geoFillUseAI";
}
