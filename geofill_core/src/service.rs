//! The state-owning profile service.
//!
//! One `ProfileService` owns the profile, locale context, lock set and
//! settings. Callers that run it behind a channel get serialized mutations
//! for free; every bulk update goes through [`reconcile`].

use std::sync::Arc;

use chrono::Utc;
use geofill_runtime::{
    sanitize_form_mapping, ArchiveEntry, CachedProfile, CanonicalValues, EmailDomainMode,
    FieldName, FillMode, FormScanResult, HistoryItem, LocaleContext, PageMessage, Profile,
    Settings, Theme, ThemeChoice,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::archive::{remove_archive, upsert_archive, ArchiveUpsert};
use crate::bridge::{send_with_injection, PageBridge};
use crate::error::GeofillError;
use crate::generator::{generate_password, FieldRefresh, ProfileGenerator};
use crate::history::{record_history, remove_history};
use crate::locale::LocaleCatalog;
use crate::lock::LockSet;
use crate::net::geo::location_label;
use crate::net::{ai, locate, lookup_address, AddressSource, HttpTransport, RealAddress};
use crate::reconcile::{apply_address, reconcile, FieldPolicy};
use crate::storage::Storage;

/// How the session was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    Restored,
    Located(LocationRefresh),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRefresh {
    pub label: String,
    pub fallback: bool,
    pub address_source: Option<AddressSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regenerated {
    pub via_ai: bool,
    pub address_source: Option<AddressSource>,
    /// `temp` mode was selected but no mailbox provider is available.
    pub temp_email_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    pub smart: bool,
    pub history_saved: bool,
    pub cache_cleared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainChange {
    pub email_updated: bool,
    pub temp_email_fallback: bool,
}

/// Result of a restore from an archive or history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub name: Option<String>,
    pub locked_kept: usize,
}

pub struct ProfileService<R = SmallRng> {
    generator: ProfileGenerator,
    storage: Storage,
    transport: Arc<dyn HttpTransport>,
    bridge: Arc<dyn PageBridge>,
    rng: R,
    profile: Profile,
    context: LocaleContext,
    locks: LockSet,
    settings: Settings,
    email_domain: EmailDomainMode,
    custom_domain: Option<String>,
    theme: Theme,
    use_ai: bool,
    location_label: String,
}

impl ProfileService<SmallRng> {
    pub fn with_entropy(
        catalog: Arc<LocaleCatalog>,
        storage: Storage,
        transport: Arc<dyn HttpTransport>,
        bridge: Arc<dyn PageBridge>,
    ) -> Self {
        Self::new(catalog, storage, transport, bridge, SmallRng::from_entropy())
    }
}

impl<R: Rng> ProfileService<R> {
    /// Build a service from persisted preferences. No network access happens
    /// until [`Self::init`].
    pub fn new(
        catalog: Arc<LocaleCatalog>,
        storage: Storage,
        transport: Arc<dyn HttpTransport>,
        bridge: Arc<dyn PageBridge>,
        rng: R,
    ) -> Self {
        let mut settings = storage.settings();
        if settings.geoapify_key.is_empty() {
            settings.geoapify_key = storage.geoapify_key();
        }
        let locks = storage.locked_fields();
        let theme = storage.theme();
        let use_ai = storage.use_ai();
        let default_country = catalog.default_locale().country.clone();
        Self {
            generator: ProfileGenerator::new(catalog),
            storage,
            transport,
            bridge,
            rng,
            profile: Profile::new(),
            context: LocaleContext::new(default_country.clone(), "", ""),
            locks,
            settings,
            email_domain: EmailDomainMode::default(),
            custom_domain: None,
            theme,
            use_ai,
            location_label: location_label(&default_country, "", true),
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn context(&self) -> &LocaleContext {
        &self.context
    }

    pub fn locks(&self) -> &LockSet {
        &self.locks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn use_ai(&self) -> bool {
        self.use_ai
    }

    /// Model paths run only with the toggle on and a usable configuration.
    pub fn ai_active(&self) -> bool {
        self.use_ai && self.settings.ai_ready()
    }

    pub fn email_domain(&self) -> &EmailDomainMode {
        &self.email_domain
    }

    pub fn custom_domain(&self) -> Option<&str> {
        self.custom_domain.as_deref()
    }

    pub fn location_label(&self) -> &str {
        &self.location_label
    }

    pub fn catalog(&self) -> &LocaleCatalog {
        self.generator.catalog()
    }

    /// Restore the cached session, or locate the user and generate afresh.
    pub async fn init(&mut self) -> SessionStart {
        if let Some(cached) = self.storage.cached_profile() {
            self.profile = cached.current_data;
            self.context = cached.ip_data;
            if self.context.country.is_empty() {
                self.context.country = self.catalog().default_locale().country.clone();
            }
            self.email_domain = cached.email_domain.unwrap_or_default();
            self.custom_domain = cached.custom_domain;
            self.generator
                .set_email_domain(&self.email_domain, self.custom_domain.as_deref());
            self.location_label = location_label(&self.context.country, &self.context.city, false);
            tracing::info!(
                target: "geofill::service",
                country = %self.context.country,
                "session.restored"
            );
            return SessionStart::Restored;
        }
        SessionStart::Located(self.refresh_location().await)
    }

    /// Detect the location, then regenerate with a real-address lookup.
    pub async fn refresh_location(&mut self) -> LocationRefresh {
        let found = locate(self.transport.as_ref()).await;
        let fallback = found.is_fallback();
        let country = self.generator.catalog().normalize_country(&found.country);
        self.context = LocaleContext::new(country.clone(), found.city.clone(), found.region);
        self.location_label = location_label(&country, &found.city, fallback);
        tracing::info!(
            target: "geofill::service",
            country = %self.context.country,
            city = %self.context.city,
            fallback,
            "location.refreshed"
        );

        let generated = self
            .generator
            .generate_all(&self.context, &self.settings, &mut self.rng);
        let address = self.lookup_real_address(&generated).await;
        reconcile(&mut self.profile, &self.locks, |profile, locks| {
            *profile = generated;
            if let Some(found) = &address {
                apply_address(profile, locks, found);
            }
        });
        self.persist();
        LocationRefresh {
            label: self.location_label.clone(),
            fallback,
            address_source: address.map(|found| found.source),
        }
    }

    /// Full regeneration; goes through the model when AI is active.
    pub async fn regenerate(&mut self) -> Result<Regenerated, GeofillError> {
        if self.ai_active() {
            return self.generate_with_ai().await;
        }
        let generated = self
            .generator
            .generate_all(&self.context, &self.settings, &mut self.rng);
        let address = self.lookup_real_address(&generated).await;
        let country = generated.get(FieldName::Country).to_string();
        let policy = FieldPolicy {
            settings: &self.settings,
            email_domain: &self.email_domain,
            country: &country,
            address: address.as_ref(),
        };
        let generator = &self.generator;
        let rng = &mut self.rng;
        reconcile(&mut self.profile, &self.locks, |profile, locks| {
            *profile = generated;
            policy.apply(profile, locks, generator, rng);
        });
        self.persist();
        tracing::info!(target: "geofill::service", locked = self.locks.len(), "profile.regenerated");
        Ok(Regenerated {
            via_ai: false,
            address_source: address.map(|found| found.source),
            temp_email_fallback: self.temp_email_fallback(),
        })
    }

    /// Model-assisted regeneration. Model output is merged over the current
    /// profile, then password, phone and email-domain rules are reapplied.
    pub async fn generate_with_ai(&mut self) -> Result<Regenerated, GeofillError> {
        let country = self.context.country_or_default().to_string();
        let locked: Profile = self
            .locks
            .iter()
            .filter_map(|field| {
                self.profile
                    .value(field)
                    .map(|value| (field, value.to_string()))
            })
            .collect();
        let suggested =
            ai::generate_profile(self.transport.as_ref(), &self.settings, &country, &locked)
                .await?;

        let policy = FieldPolicy {
            settings: &self.settings,
            email_domain: &self.email_domain,
            country: &country,
            address: None,
        };
        let generator = &self.generator;
        let rng = &mut self.rng;
        reconcile(&mut self.profile, &self.locks, |profile, locks| {
            profile.merge(&suggested);
            policy.apply(profile, locks, generator, rng);
        });
        self.persist();
        tracing::info!(target: "geofill::service", country = %country, "profile.generated_ai");
        Ok(Regenerated {
            via_ai: true,
            address_source: None,
            temp_email_fallback: false,
        })
    }

    /// Switch country. City and region are cleared so location is re-derived.
    pub fn change_country(&mut self, name: &str) -> Result<String, GeofillError> {
        let country = self
            .generator
            .catalog()
            .resolve(name)
            .map(|locale| locale.country.clone())
            .ok_or_else(|| GeofillError::validation(format!("不支持的国家: {}", name.trim())))?;
        self.context = LocaleContext::new(country.clone(), "", "");
        self.location_label = location_label(&country, "", false);

        let generated = self
            .generator
            .generate_all(&self.context, &self.settings, &mut self.rng);
        let policy = FieldPolicy {
            settings: &self.settings,
            email_domain: &self.email_domain,
            country: &country,
            address: None,
        };
        let generator = &self.generator;
        let rng = &mut self.rng;
        reconcile(&mut self.profile, &self.locks, |profile, locks| {
            *profile = generated;
            policy.apply(profile, locks, generator, rng);
        });
        self.persist();
        tracing::info!(target: "geofill::service", country = %country, "country.changed");
        Ok(country)
    }

    pub fn refresh_field(&mut self, field: FieldName) -> Result<(), GeofillError> {
        if self.locks.contains(field) {
            return Err(GeofillError::Locked(field));
        }
        let refreshed = self.generator.regenerate_field(
            field,
            &self.profile,
            &self.context,
            &self.settings,
            &mut self.rng,
        );
        match refreshed {
            FieldRefresh::Value(value) => self.profile.set(field, value),
            FieldRefresh::Location {
                city,
                state,
                zip_code,
            } => {
                for (field, value) in [
                    (FieldName::City, city),
                    (FieldName::State, state),
                    (FieldName::ZipCode, zip_code),
                ] {
                    if !self.locks.contains(field) {
                        self.profile.set(field, value);
                    }
                }
            }
        }
        self.persist();
        Ok(())
    }

    /// Direct edit. Locked fields must be unlocked first.
    pub fn set_field(&mut self, field: FieldName, value: &str) -> Result<(), GeofillError> {
        if self.locks.contains(field) {
            return Err(GeofillError::Locked(field));
        }
        self.profile.set(field, value);
        self.persist();
        Ok(())
    }

    pub fn lock(&mut self, field: FieldName) -> bool {
        let changed = self.locks.lock(field);
        self.storage.save_locked_fields(&self.locks);
        changed
    }

    pub fn unlock(&mut self, field: FieldName) -> bool {
        let changed = self.locks.unlock(field);
        self.storage.save_locked_fields(&self.locks);
        changed
    }

    /// Returns the new lock state.
    pub fn toggle_lock(&mut self, field: FieldName) -> bool {
        let locked = self.locks.toggle(field);
        self.storage.save_locked_fields(&self.locks);
        locked
    }

    pub fn set_email_domain(
        &mut self,
        mode: EmailDomainMode,
        custom_domain: Option<String>,
    ) -> Result<DomainChange, GeofillError> {
        let custom_domain = custom_domain
            .map(|domain| domain.trim().trim_start_matches('@').to_string())
            .filter(|domain| !domain.is_empty());
        if mode == EmailDomainMode::Custom && custom_domain.is_none() {
            return Err(GeofillError::validation("请输入自定义域名"));
        }
        self.email_domain = mode;
        if custom_domain.is_some() {
            self.custom_domain = custom_domain;
        }
        self.generator
            .set_email_domain(&self.email_domain, self.custom_domain.as_deref());

        let email_updated = !self.locks.contains(FieldName::Email);
        if email_updated {
            let username = match self.profile.get(FieldName::Username) {
                "" => "user".to_string(),
                username => username.to_string(),
            };
            let email = self.generator.generate_email(
                &username,
                self.context.country_or_default(),
                &mut self.rng,
            );
            self.profile.set(FieldName::Email, email);
        }
        self.persist();
        Ok(DomainChange {
            email_updated,
            temp_email_fallback: email_updated && self.temp_email_fallback(),
        })
    }

    pub fn save_archive(&mut self, name: &str) -> Result<ArchiveUpsert, GeofillError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GeofillError::validation("请输入存档名称"));
        }
        let mut archives = self.storage.archives();
        let outcome = upsert_archive(
            &mut archives,
            name,
            self.profile.clone(),
            Utc::now().timestamp_millis(),
        );
        if !self.storage.save_archives(&archives) {
            return Err(GeofillError::validation("保存失败"));
        }
        Ok(outcome)
    }

    pub fn archives(&self) -> Vec<ArchiveEntry> {
        self.storage.archives()
    }

    pub fn load_archive(&mut self, index: usize) -> Result<Restored, GeofillError> {
        let entry = self
            .storage
            .archives()
            .into_iter()
            .nth(index)
            .ok_or_else(|| GeofillError::validation("存档不存在"))?;
        reconcile(&mut self.profile, &self.locks, |profile, _| {
            *profile = entry.data;
        });
        self.persist();
        Ok(Restored {
            name: Some(entry.name),
            locked_kept: self.locks.len(),
        })
    }

    pub fn delete_archive(&mut self, index: usize) -> Result<String, GeofillError> {
        let mut archives = self.storage.archives();
        let removed =
            remove_archive(&mut archives, index).ok_or_else(|| GeofillError::validation("存档不存在"))?;
        self.storage.save_archives(&archives);
        Ok(removed.name)
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.storage.history()
    }

    /// Record the current profile. Profiles without a first name are skipped.
    pub fn save_to_history(&mut self) -> bool {
        if self.profile.get(FieldName::FirstName).is_empty() {
            return false;
        }
        let now = Utc::now();
        let country = match self.context.country.as_str() {
            "" => "Unknown".to_string(),
            country => country.to_string(),
        };
        let mut history = self.storage.history();
        record_history(
            &mut history,
            HistoryItem {
                id: now.timestamp_millis(),
                timestamp: now,
                data: self.profile.clone(),
                country,
            },
        );
        self.storage.save_history(&history)
    }

    pub fn load_history(&mut self, id: i64) -> Result<Restored, GeofillError> {
        let item = self
            .storage
            .history()
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| GeofillError::validation("历史记录不存在"))?;
        let country = [item.country.as_str(), item.data.get(FieldName::Country)]
            .into_iter()
            .find(|country| !country.is_empty() && *country != "Unknown")
            .unwrap_or(geofill_runtime::DEFAULT_COUNTRY)
            .to_string();
        reconcile(&mut self.profile, &self.locks, |profile, _| {
            *profile = item.data;
        });
        self.context.country = country;
        self.persist();
        Ok(Restored {
            name: None,
            locked_kept: self.locks.len(),
        })
    }

    pub fn delete_history(&mut self, id: i64) -> bool {
        let mut history = self.storage.history();
        let removed = remove_history(&mut history, id);
        if removed {
            self.storage.save_history(&history);
        }
        removed
    }

    pub fn clear_history(&mut self) -> bool {
        self.storage.remove(geofill_runtime::keys::HISTORY)
    }

    /// Fill the page. Smart mode scans the form and lets the model map
    /// values when AI is active; otherwise the profile is sent as-is.
    pub async fn fill_form(&mut self, mode: FillMode) -> Result<FillOutcome, GeofillError> {
        let smart = mode == FillMode::Smart && self.ai_active();
        if smart {
            let reply = send_with_injection(self.bridge.as_ref(), &PageMessage::ScanForm).await?;
            let scan: FormScanResult = serde_json::from_value(reply).map_err(|err| {
                GeofillError::Format(format!("invalid form scan: {err}"))
            })?;
            if scan.fields.is_empty() {
                return Err(GeofillError::validation("未找到可见的表单字段"));
            }
            let mut mapping =
                ai::map_form(self.transport.as_ref(), &self.settings, &self.profile, &scan).await?;
            let mut canonical = CanonicalProfile {
                profile: &self.profile,
                settings: &self.settings,
                generator: &self.generator,
                country: self.context.country_or_default(),
                rng: &mut self.rng,
            };
            sanitize_form_mapping(&mut mapping, &scan, &mut canonical);
            tracing::info!(
                target: "geofill::service",
                fields = mapping.len(),
                "fill.smart_mapping"
            );
            send_with_injection(
                self.bridge.as_ref(),
                &PageMessage::FillFormSmart { data: mapping },
            )
            .await?;
        } else {
            send_with_injection(
                self.bridge.as_ref(),
                &PageMessage::FillForm {
                    data: self.profile.clone(),
                },
            )
            .await?;
        }

        let history_saved = self.save_to_history();
        let cache_cleared = self.settings.auto_clear_data && self.storage.clear_cached_profile();
        Ok(FillOutcome {
            smart,
            history_saved,
            cache_cleared,
        })
    }

    pub async fn test_ai(&self) -> Result<(), GeofillError> {
        ai::test_connection(self.transport.as_ref(), &self.settings).await?;
        Ok(())
    }

    /// Update one setting by its camelCase key. Invalid values are rejected
    /// without persisting anything.
    pub fn update_setting(&mut self, key: &str, raw: &str) -> Result<(), GeofillError> {
        let mut object = match serde_json::to_value(&self.settings) {
            Ok(Value::Object(object)) => object,
            _ => return Err(GeofillError::validation("settings are not an object")),
        };
        let current = object
            .get(key)
            .ok_or_else(|| GeofillError::validation(format!("未知设置: {key}")))?;
        let raw = raw.trim();
        let value = match current {
            Value::Bool(_) => {
                let enabled = geofill_runtime::command_text::parse_switch(raw, "setting value")
                    .map_err(|err| GeofillError::validation(err.to_string()))?;
                Value::Bool(enabled)
            }
            Value::Number(_) => {
                let number = raw.parse::<u32>().map_err(|err| {
                    GeofillError::validation(format!("invalid number '{raw}' for {key}: {err}"))
                })?;
                Value::from(number)
            }
            _ => Value::String(raw.to_string()),
        };
        object.insert(key.to_string(), value);
        let updated: Settings = serde_json::from_value(Value::Object(object))
            .map_err(|err| GeofillError::validation(err.to_string()))?;
        updated.validate()?;

        self.settings = updated;
        self.storage.save_settings(&self.settings);
        match key {
            "geoapifyKey" => {
                self.storage.save_geoapify_key(&self.settings.geoapify_key);
            }
            "autoClearData" => {
                self.storage.save_auto_clear(self.settings.auto_clear_data);
            }
            _ => {}
        }
        tracing::info!(target: "geofill::service", key, "settings.updated");
        Ok(())
    }

    pub fn set_use_ai(&mut self, enabled: bool) {
        self.use_ai = enabled;
        self.storage.save_use_ai(enabled);
    }

    pub fn set_theme(&mut self, choice: ThemeChoice) -> Theme {
        self.theme = match choice {
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Toggle => self.theme.toggled(),
        };
        self.storage.save_theme(self.theme);
        self.theme
    }

    /// All fields as labelled lines, the "copy all" text.
    pub fn summary_text(&self) -> String {
        let profile = &self.profile;
        let gender = if profile.get(FieldName::Gender) == "male" {
            "男"
        } else {
            "女"
        };
        [
            format!(
                "姓名: {} {}",
                profile.get(FieldName::FirstName),
                profile.get(FieldName::LastName)
            ),
            format!("性别: {gender}"),
            format!("生日: {}", profile.get(FieldName::Birthday)),
            format!("用户名: {}", profile.get(FieldName::Username)),
            format!("邮箱: {}", profile.get(FieldName::Email)),
            format!("密码: {}", profile.get(FieldName::Password)),
            format!("电话: {}", profile.get(FieldName::Phone)),
            format!("地址: {}", profile.get(FieldName::Address)),
            format!("城市: {}", profile.get(FieldName::City)),
            format!("州 / 省: {}", profile.get(FieldName::State)),
            format!("邮编: {}", profile.get(FieldName::ZipCode)),
            format!("国家: {}", profile.get(FieldName::Country)),
        ]
        .join("\n")
    }

    async fn lookup_real_address(&mut self, generated: &Profile) -> Option<RealAddress> {
        if !self.settings.use_address_api {
            return None;
        }
        let all_locked = [FieldName::Address, FieldName::State, FieldName::ZipCode]
            .into_iter()
            .all(|field| self.locks.contains(field));
        if all_locked {
            return None;
        }
        let query = self.generator.address_query(
            generated.get(FieldName::Country),
            generated.get(FieldName::City),
            &self.settings.geoapify_key,
            &mut self.rng,
        );
        let found = lookup_address(self.transport.as_ref(), query).await;
        tracing::info!(
            target: "geofill::service",
            source = found.source.label(),
            "address.resolved"
        );
        Some(found)
    }

    fn temp_email_fallback(&self) -> bool {
        self.email_domain == EmailDomainMode::Temp && !self.locks.contains(FieldName::Email)
    }

    fn persist(&mut self) {
        let cached = CachedProfile::new(
            self.profile.clone(),
            self.context.clone(),
            self.email_domain.clone(),
            self.custom_domain.clone(),
        );
        self.storage.save_cached_profile(&cached);
    }
}

/// Canonical password and phone for smart fills: the profile's own values,
/// generated locally when missing.
struct CanonicalProfile<'a, R> {
    profile: &'a Profile,
    settings: &'a Settings,
    generator: &'a ProfileGenerator,
    country: &'a str,
    rng: &'a mut R,
}

impl<R: Rng> CanonicalValues for CanonicalProfile<'_, R> {
    fn password(&mut self) -> Option<String> {
        match self.profile.get(FieldName::Password) {
            "" => Some(generate_password(self.settings, &mut *self.rng)),
            password => Some(password.to_string()),
        }
    }

    fn phone(&mut self) -> Option<String> {
        match self.profile.get(FieldName::Phone) {
            "" => Some(self.generator.generate_phone(self.country, &mut *self.rng)),
            phone => Some(phone.to_string()),
        }
    }
}
