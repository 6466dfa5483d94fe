//! Key-value persistence.
//!
//! Backends report [`StorageError`]; the typed [`Storage`] facade logs and
//! swallows them so a broken store degrades features instead of failing
//! user actions.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use geofill_runtime::{
    keys, ArchiveEntry, CachedProfile, HistoryItem, Settings, Theme,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::lock::LockSet;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read store {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write store {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("store root must be a JSON object")]
    NotAnObject,
    #[error("value under '{key}' has an unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, used by tests and as a fallback when the file store
/// cannot be opened.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON object on disk. Every write replaces the file atomically.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(entries) => entries,
                _ => return Err(StorageError::NotAnObject),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(StorageError::ReadFailed { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let write_failed = |source: io::Error| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        let contents = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        fs::write(&tmp, contents).map_err(write_failed)?;
        fs::rename(&tmp, &self.path).map_err(write_failed)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Typed view over a [`KeyValueStore`].
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Open the file store at `path`, falling back to memory when it is unreadable.
    pub fn open_file(path: &Path) -> Self {
        match JsonFileStore::open(path) {
            Ok(store) => {
                tracing::info!(target: "geofill::storage", path = %path.display(), "store.opened=file");
                Self::new(store)
            }
            Err(err) => {
                tracing::warn!(
                    target: "geofill::storage",
                    path = %path.display(),
                    error = %err,
                    "store.open_failed"
                );
                tracing::info!(target: "geofill::storage", "store.opened=memory");
                Self::in_memory()
            }
        }
    }

    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StorageError::Shape {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_load(key).unwrap_or_else(|err| {
            tracing::warn!(target: "geofill::storage", key, error = %err, "store.load_failed");
            None
        })
    }

    /// Returns `false` when the value could not be persisted.
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_value(value)
            .map_err(StorageError::from)
            .and_then(|value| self.backend.set(key, value));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "geofill::storage", key, error = %err, "store.save_failed");
                false
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "geofill::storage", key, error = %err, "store.remove_failed");
                false
            }
        }
    }

    /// The cached session, removed and ignored when its version is stale.
    pub fn cached_profile(&mut self) -> Option<CachedProfile> {
        let cached: CachedProfile = self.load(keys::CACHED_PROFILE)?;
        if cached.is_current() {
            return Some(cached);
        }
        tracing::info!(
            target: "geofill::storage",
            version = %cached.version,
            "cache.version_mismatch=cleared"
        );
        self.remove(keys::CACHED_PROFILE);
        None
    }

    pub fn save_cached_profile(&mut self, cached: &CachedProfile) -> bool {
        self.save(keys::CACHED_PROFILE, cached)
    }

    pub fn clear_cached_profile(&mut self) -> bool {
        self.remove(keys::CACHED_PROFILE)
    }

    pub fn locked_fields(&self) -> LockSet {
        self.load(keys::LOCKED_FIELDS).unwrap_or_default()
    }

    pub fn save_locked_fields(&mut self, locks: &LockSet) -> bool {
        self.save(keys::LOCKED_FIELDS, locks)
    }

    /// Stored settings merged over the defaults.
    pub fn settings(&self) -> Settings {
        self.load(keys::SETTINGS).unwrap_or_default()
    }

    pub fn save_settings(&mut self, settings: &Settings) -> bool {
        self.save(keys::SETTINGS, settings)
    }

    pub fn archives(&self) -> Vec<ArchiveEntry> {
        self.load(keys::ARCHIVES).unwrap_or_default()
    }

    pub fn save_archives(&mut self, archives: &[ArchiveEntry]) -> bool {
        self.save(keys::ARCHIVES, &archives)
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.load(keys::HISTORY).unwrap_or_default()
    }

    pub fn save_history(&mut self, history: &[HistoryItem]) -> bool {
        self.save(keys::HISTORY, &history)
    }

    pub fn theme(&self) -> Theme {
        self.load(keys::THEME).unwrap_or_default()
    }

    pub fn save_theme(&mut self, theme: Theme) -> bool {
        self.save(keys::THEME, &theme)
    }

    pub fn geoapify_key(&self) -> String {
        self.load(keys::GEOAPIFY_KEY).unwrap_or_default()
    }

    pub fn save_geoapify_key(&mut self, key: &str) -> bool {
        self.save(keys::GEOAPIFY_KEY, &key)
    }

    pub fn use_ai(&self) -> bool {
        self.load(keys::USE_AI).unwrap_or(false)
    }

    pub fn save_use_ai(&mut self, enabled: bool) -> bool {
        self.save(keys::USE_AI, &enabled)
    }

    pub fn save_auto_clear(&mut self, enabled: bool) -> bool {
        self.save(keys::AUTO_CLEAR, &enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofill_runtime::{EmailDomainMode, FieldName, LocaleContext, Profile};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geofill-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);
        {
            let mut storage = Storage::new(JsonFileStore::open(&path).unwrap());
            assert!(storage.save_theme(Theme::Light));
            let locks: LockSet = [FieldName::Email].into_iter().collect();
            assert!(storage.save_locked_fields(&locks));
        }
        let storage = Storage::new(JsonFileStore::open(&path).unwrap());
        assert_eq!(storage.theme(), Theme::Light);
        assert!(storage.locked_fields().contains(FieldName::Email));
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"geoFillTheme\": \"light\""));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn stale_cache_versions_are_cleared() {
        let mut storage = Storage::in_memory();
        let mut cached = CachedProfile::new(
            Profile::new().with(FieldName::FirstName, "Ada"),
            LocaleContext::new("Japan", "Tokyo", ""),
            EmailDomainMode::default(),
            None,
        );
        cached.version = "v2".to_string();
        storage.save_cached_profile(&cached);

        assert!(storage.cached_profile().is_none());
        assert!(storage
            .try_load::<Value>(keys::CACHED_PROFILE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_values_degrade_to_defaults() {
        let mut storage = Storage::in_memory();
        storage.save(keys::ARCHIVES, &"not a list");
        assert!(storage.archives().is_empty());
        assert!(matches!(
            storage.try_load::<Vec<ArchiveEntry>>(keys::ARCHIVES),
            Err(StorageError::Shape { .. })
        ));
    }

    #[test]
    fn partial_settings_merge_over_defaults() {
        let mut storage = Storage::in_memory();
        storage.save(
            keys::SETTINGS,
            &serde_json::json!({ "passwordLength": 20, "enableAI": true }),
        );
        let settings = storage.settings();
        assert_eq!(settings.password_length, 20);
        assert!(settings.enable_ai);
        assert_eq!(settings.max_age, Settings::default().max_age);
    }

    #[test]
    fn non_object_files_are_rejected() {
        let path = temp_path("array");
        fs::write(&path, "[1,2,3]").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StorageError::NotAnObject)
        ));
        let _ = fs::remove_file(&path);
    }
}
