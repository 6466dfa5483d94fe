use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_LOCALES: &str = include_str!("data/locales.json");

/// A name with an optional romanized form, written `native|latin` in data files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct NameEntry {
    pub native: String,
    pub latin: String,
}

impl From<String> for NameEntry {
    fn from(value: String) -> Self {
        match value.split_once('|') {
            Some((native, latin)) => Self {
                native: native.trim().to_string(),
                latin: latin.trim().to_string(),
            },
            None => Self {
                native: value.trim().to_string(),
                latin: value.trim().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub zip_prefix: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleRecord {
    pub country: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub male_first_names: Vec<NameEntry>,
    pub female_first_names: Vec<NameEntry>,
    pub last_names: Vec<NameEntry>,
    pub streets: Vec<NameEntry>,
    pub address_format: String,
    pub cities: Vec<CityRecord>,
    pub zip_pattern: String,
    pub phone_patterns: Vec<String>,
    pub email_domains: Vec<String>,
}

impl LocaleRecord {
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.country.eq_ignore_ascii_case(name)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    pub fn city(&self, name: &str) -> Option<&CityRecord> {
        let name = name.trim();
        self.cities
            .iter()
            .find(|city| city.name.eq_ignore_ascii_case(name))
    }
}

/// Per-country generation data.
#[derive(Debug, Clone, Deserialize)]
pub struct LocaleCatalog {
    default_country: String,
    locales: Vec<LocaleRecord>,
}

impl LocaleCatalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            LocaleCatalog::from_json_str(BUILTIN_LOCALES)
                .expect("builtin locale catalog should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, LocalesError> {
        let catalog: LocaleCatalog = serde_json::from_str(json)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, LocalesError> {
        let contents = fs::read_to_string(path).map_err(|source| LocalesError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        LocaleCatalog::from_json_str(&contents)
    }

    fn check(&self) -> Result<(), LocalesError> {
        if self.resolve(&self.default_country).is_none() {
            return Err(LocalesError::MissingDefault(self.default_country.clone()));
        }
        for locale in &self.locales {
            let empty = [
                ("male_first_names", locale.male_first_names.is_empty()),
                ("female_first_names", locale.female_first_names.is_empty()),
                ("last_names", locale.last_names.is_empty()),
                ("streets", locale.streets.is_empty()),
                ("cities", locale.cities.is_empty()),
                ("phone_patterns", locale.phone_patterns.is_empty()),
                ("email_domains", locale.email_domains.is_empty()),
            ];
            if let Some((list, _)) = empty.into_iter().find(|(_, is_empty)| *is_empty) {
                return Err(LocalesError::EmptyList {
                    country: locale.country.clone(),
                    list,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(|locale| locale.country.as_str())
    }

    pub fn resolve(&self, name: &str) -> Option<&LocaleRecord> {
        self.locales.iter().find(|locale| locale.matches(name))
    }

    pub fn default_locale(&self) -> &LocaleRecord {
        self.resolve(&self.default_country)
            .unwrap_or_else(|| &self.locales[0])
    }

    /// Resolve `name`, falling back to the default locale.
    pub fn locale_or_default(&self, name: &str) -> &LocaleRecord {
        self.resolve(name).unwrap_or_else(|| self.default_locale())
    }

    /// Map provider or user spellings onto the catalog's country names.
    pub fn normalize_country(&self, name: &str) -> String {
        match self.resolve(name) {
            Some(locale) => locale.country.clone(),
            None => {
                tracing::debug!(
                    target: "geofill::locale",
                    country = name,
                    "country.unsupported=default"
                );
                self.default_locale().country.clone()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LocalesError {
    #[error("failed to parse locale catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read locale catalog from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("default country '{0}' is not in the catalog")]
    MissingDefault(String),
    #[error("locale '{country}' has an empty {list} list")]
    EmptyList {
        country: String,
        list: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct LocalesMetadata {
    path: Option<PathBuf>,
}

impl LocalesMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

pub fn load_locales_from_env() -> (Arc<LocaleCatalog>, LocalesMetadata) {
    load_locales(env::var("GEOFILL_LOCALES_PATH").ok().map(PathBuf::from))
}

/// Load the catalog from `path`, or the builtin one when absent or unreadable.
pub fn load_locales(path: Option<PathBuf>) -> (Arc<LocaleCatalog>, LocalesMetadata) {
    let Some(path) = path else {
        tracing::info!(target: "geofill::locale", "locales.loaded=builtin");
        return (LocaleCatalog::builtin(), LocalesMetadata::new(None));
    };

    match LocaleCatalog::from_file(&path) {
        Ok(catalog) => {
            tracing::info!(
                target: "geofill::locale",
                path = %path.display(),
                locales = catalog.len(),
                "locales.loaded=file"
            );
            (Arc::new(catalog), LocalesMetadata::new(Some(path)))
        }
        Err(err) => {
            tracing::warn!(
                target: "geofill::locale",
                path = %path.display(),
                error = %err,
                "locales.load_failed"
            );
            tracing::info!(target: "geofill::locale", "locales.loaded=builtin");
            (LocaleCatalog::builtin(), LocalesMetadata::new(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = LocaleCatalog::builtin();
        assert!(catalog.len() >= 8);
        assert_eq!(catalog.default_locale().country, "United States");
    }

    #[test]
    fn aliases_normalize_to_catalog_names() {
        let catalog = LocaleCatalog::builtin();
        assert_eq!(catalog.normalize_country("USA"), "United States");
        assert_eq!(catalog.normalize_country("日本"), "Japan");
        assert_eq!(catalog.normalize_country("united kingdom"), "United Kingdom");
        assert_eq!(catalog.normalize_country("Atlantis"), "United States");
    }

    #[test]
    fn romanized_names_split_on_pipe() {
        let entry = NameEntry::from("太郎|Taro".to_string());
        assert_eq!(entry.native, "太郎");
        assert_eq!(entry.latin, "Taro");
        let plain = NameEntry::from("Ada".to_string());
        assert_eq!(plain.latin, "Ada");
    }

    #[test]
    fn catalogs_with_empty_lists_are_rejected() {
        let json = r######"{
            "default_country": "Nowhere",
            "locales": [{
                "country": "Nowhere",
                "male_first_names": ["A"], "female_first_names": ["B"], "last_names": ["C"],
                "streets": ["D"], "address_format": "{number} {street}", "cities": [],
                "zip_pattern": "#####", "phone_patterns": ["###"], "email_domains": ["x.y"]
            }]
        }"######;
        assert!(matches!(
            LocaleCatalog::from_json_str(json),
            Err(LocalesError::EmptyList { list: "cities", .. })
        ));
    }
}
