//! Rule-based profile generation.
//!
//! Everything produced here satisfies the local format rules (password
//! composition, locale phone and zip patterns), which is why the reconciler
//! lets these values override model output.

use std::sync::Arc;

use bitflags::bitflags;
use chrono::{Days, Months, NaiveDate, Utc};
use geofill_runtime::{EmailDomainMode, FieldName, LocaleContext, Profile, Settings};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::locale::{CityRecord, LocaleCatalog, LocaleRecord, NameEntry};
use crate::net::{AddressQuery, AddressSource, RealAddress};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";
const PHONE_ATTEMPTS: usize = 32;
const ADDRESS_JITTER: f64 = 0.01;

bitflags! {
    /// Character classes a generated password must contain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharClasses: u8 {
        const UPPER = 0b0001;
        const LOWER = 0b0010;
        const DIGITS = 0b0100;
        const SYMBOLS = 0b1000;
    }
}

impl CharClasses {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut classes = CharClasses::empty();
        classes.set(CharClasses::UPPER, settings.pwd_uppercase);
        classes.set(CharClasses::LOWER, settings.pwd_lowercase);
        classes.set(CharClasses::DIGITS, settings.pwd_numbers);
        classes.set(CharClasses::SYMBOLS, settings.pwd_symbols);
        if classes.is_empty() {
            CharClasses::LOWER | CharClasses::DIGITS
        } else {
            classes
        }
    }

    fn alphabets(self) -> Vec<&'static [u8]> {
        let mut sets = Vec::with_capacity(4);
        if self.contains(CharClasses::UPPER) {
            sets.push(UPPER);
        }
        if self.contains(CharClasses::LOWER) {
            sets.push(LOWER);
        }
        if self.contains(CharClasses::DIGITS) {
            sets.push(DIGITS);
        }
        if self.contains(CharClasses::SYMBOLS) {
            sets.push(SYMBOLS);
        }
        sets
    }

    /// Whether `password` contains at least one character of every class.
    pub fn satisfied_by(self, password: &str) -> bool {
        self.alphabets()
            .iter()
            .all(|set| password.bytes().any(|byte| set.contains(&byte)))
    }
}

/// True for phone numbers that look like filler: fewer than four digits, or
/// ending in `0000`, `1234` or one digit repeated four times.
pub fn is_placeholder_phone(phone: &str) -> bool {
    let digits: Vec<u8> = phone.bytes().filter(u8::is_ascii_digit).collect();
    if digits.len() < 4 {
        return true;
    }
    let tail = &digits[digits.len() - 4..];
    tail == b"1234" || tail == b"0000" || tail.iter().all(|digit| *digit == tail[0])
}

/// Result of refreshing a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRefresh {
    Value(String),
    /// City, state and zip are refreshed together so they stay coherent.
    Location {
        city: String,
        state: String,
        zip_code: String,
    },
}

#[derive(Debug, Clone)]
struct Location {
    city: String,
    state: String,
    zip_code: String,
}

/// Local generator backed by a [`LocaleCatalog`].
#[derive(Debug, Clone)]
pub struct ProfileGenerator {
    catalog: Arc<LocaleCatalog>,
    email_domain: Option<String>,
}

impl ProfileGenerator {
    pub fn new(catalog: Arc<LocaleCatalog>) -> Self {
        Self {
            catalog,
            email_domain: Some("gmail.com".to_string()),
        }
    }

    pub fn catalog(&self) -> &LocaleCatalog {
        &self.catalog
    }

    /// Select the domain used by [`Self::generate_email`].
    ///
    /// `Temp` and an empty custom domain fall back to a locale-typical domain.
    pub fn set_email_domain(&mut self, mode: &EmailDomainMode, custom_domain: Option<&str>) {
        self.email_domain = match mode {
            EmailDomainMode::Fixed(domain) => Some(domain.clone()),
            EmailDomainMode::Custom => custom_domain
                .map(|domain| domain.trim().trim_start_matches('@').to_string())
                .filter(|domain| !domain.is_empty()),
            EmailDomainMode::Temp => None,
        };
    }

    pub fn email_domain(&self) -> Option<&str> {
        self.email_domain.as_deref()
    }

    pub fn generate_all<R: Rng + ?Sized>(
        &self,
        context: &LocaleContext,
        settings: &Settings,
        rng: &mut R,
    ) -> Profile {
        let locale = self.catalog.locale_or_default(&context.country);
        let male = rng.gen_bool(0.5);
        let first = pick_first_name(locale, male, rng);
        let last = pick(&locale.last_names, rng);
        let username = make_username(&first.latin, &last.latin, rng);
        let email = self.email_for(&username, locale, rng);
        let location = pick_location(locale, context, rng);

        Profile::new()
            .with(FieldName::FirstName, first.native.clone())
            .with(FieldName::LastName, last.native.clone())
            .with(FieldName::Gender, if male { "male" } else { "female" })
            .with(FieldName::Birthday, generate_birthday(settings, rng))
            .with(FieldName::Username, username)
            .with(FieldName::Email, email)
            .with(FieldName::Password, generate_password(settings, rng))
            .with(FieldName::Phone, phone_for_locale(locale, rng))
            .with(FieldName::Address, format_address(locale, rng))
            .with(FieldName::City, location.city)
            .with(FieldName::State, location.state)
            .with(FieldName::ZipCode, location.zip_code)
            .with(FieldName::Country, locale.country.clone())
    }

    pub fn regenerate_field<R: Rng + ?Sized>(
        &self,
        field: FieldName,
        profile: &Profile,
        context: &LocaleContext,
        settings: &Settings,
        rng: &mut R,
    ) -> FieldRefresh {
        let country = match profile.get(FieldName::Country) {
            "" => context.country.as_str(),
            country => country,
        };
        let locale = self.catalog.locale_or_default(country);
        let value = match field {
            FieldName::FirstName => {
                let male = match profile.get(FieldName::Gender) {
                    "male" => true,
                    "female" => false,
                    _ => rng.gen_bool(0.5),
                };
                pick_first_name(locale, male, rng).native.clone()
            }
            FieldName::LastName => pick(&locale.last_names, rng).native.clone(),
            FieldName::Gender => {
                if rng.gen_bool(0.5) {
                    "male".to_string()
                } else {
                    "female".to_string()
                }
            }
            FieldName::Birthday => generate_birthday(settings, rng),
            FieldName::Username => {
                let first = pick_first_name(locale, rng.gen_bool(0.5), rng);
                let last = pick(&locale.last_names, rng);
                make_username(&first.latin, &last.latin, rng)
            }
            FieldName::Email => {
                let username = match profile.get(FieldName::Username) {
                    "" => "user",
                    username => username,
                };
                self.email_for(username, locale, rng)
            }
            FieldName::Password => generate_password(settings, rng),
            FieldName::Phone => phone_for_locale(locale, rng),
            FieldName::Address => format_address(locale, rng),
            FieldName::City | FieldName::State | FieldName::ZipCode => {
                let city = pick_city(locale, rng);
                return FieldRefresh::Location {
                    city: city.name.clone(),
                    state: city.state.clone(),
                    zip_code: fill_zip(&locale.zip_pattern, &city.zip_prefix, rng),
                };
            }
            FieldName::Country => locale.country.clone(),
        };
        FieldRefresh::Value(value)
    }

    pub fn generate_phone<R: Rng + ?Sized>(&self, country: &str, rng: &mut R) -> String {
        phone_for_locale(self.catalog.locale_or_default(country), rng)
    }

    pub fn generate_email<R: Rng + ?Sized>(
        &self,
        username: &str,
        country: &str,
        rng: &mut R,
    ) -> String {
        self.email_for(username, self.catalog.locale_or_default(country), rng)
    }

    /// Prepare a reverse-geocoding query around the catalog city, with a
    /// locally generated address as the last resort.
    pub fn address_query<R: Rng + ?Sized>(
        &self,
        country: &str,
        city: &str,
        geoapify_key: &str,
        rng: &mut R,
    ) -> AddressQuery {
        let locale = self.catalog.locale_or_default(country);
        let record = locale.city(city).unwrap_or_else(|| &locale.cities[0]);
        let local = RealAddress {
            address: format_address(locale, rng),
            state: Some(record.state.clone()),
            zip_code: Some(fill_zip(&locale.zip_pattern, &record.zip_prefix, rng)),
            source: AddressSource::Local,
        };
        AddressQuery {
            lat: record.lat + rng.gen_range(-ADDRESS_JITTER..=ADDRESS_JITTER),
            lon: record.lon + rng.gen_range(-ADDRESS_JITTER..=ADDRESS_JITTER),
            geoapify_key: geoapify_key.to_string(),
            local,
        }
    }

    fn email_for<R: Rng + ?Sized>(
        &self,
        username: &str,
        locale: &LocaleRecord,
        rng: &mut R,
    ) -> String {
        let domain = match &self.email_domain {
            Some(domain) => domain.clone(),
            None => locale
                .email_domains
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "gmail.com".to_string()),
        };
        format!("{username}@{domain}")
    }
}

/// Password honoring the configured length and character classes.
pub fn generate_password<R: Rng + ?Sized>(settings: &Settings, rng: &mut R) -> String {
    let classes = CharClasses::from_settings(settings);
    let alphabets = classes.alphabets();
    let length = (settings.password_length.clamp(4, 128) as usize).max(alphabets.len());
    let union: Vec<u8> = alphabets.iter().flat_map(|set| set.iter().copied()).collect();

    let mut bytes: Vec<u8> = alphabets
        .iter()
        .map(|set| set[rng.gen_range(0..set.len())])
        .collect();
    while bytes.len() < length {
        bytes.push(union[rng.gen_range(0..union.len())]);
    }
    bytes.shuffle(rng);
    bytes.into_iter().map(char::from).collect()
}

fn generate_birthday<R: Rng + ?Sized>(settings: &Settings, rng: &mut R) -> String {
    let (min_age, max_age) = if settings.min_age <= settings.max_age {
        (settings.min_age, settings.max_age)
    } else {
        (settings.max_age, settings.min_age)
    };
    let today = Utc::now().date_naive();
    let age = rng.gen_range(min_age..=max_age);
    let days_back = rng.gen_range(0..365u64);
    let birthday = today
        .checked_sub_months(Months::new(age * 12))
        .and_then(|date| date.checked_sub_days(Days::new(days_back)))
        .unwrap_or(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default());
    birthday.format("%Y-%m-%d").to_string()
}

fn pick<'a, R: Rng + ?Sized>(entries: &'a [NameEntry], rng: &mut R) -> &'a NameEntry {
    &entries[rng.gen_range(0..entries.len())]
}

fn pick_first_name<'a, R: Rng + ?Sized>(
    locale: &'a LocaleRecord,
    male: bool,
    rng: &mut R,
) -> &'a NameEntry {
    if male {
        pick(&locale.male_first_names, rng)
    } else {
        pick(&locale.female_first_names, rng)
    }
}

fn pick_city<'a, R: Rng + ?Sized>(locale: &'a LocaleRecord, rng: &mut R) -> &'a CityRecord {
    &locale.cities[rng.gen_range(0..locale.cities.len())]
}

fn pick_location<R: Rng + ?Sized>(
    locale: &LocaleRecord,
    context: &LocaleContext,
    rng: &mut R,
) -> Location {
    if let Some(city) = locale.city(&context.city) {
        return Location {
            city: city.name.clone(),
            state: city.state.clone(),
            zip_code: fill_zip(&locale.zip_pattern, &city.zip_prefix, rng),
        };
    }
    let fallback = pick_city(locale, rng);
    if context.city.trim().is_empty() {
        return Location {
            city: fallback.name.clone(),
            state: fallback.state.clone(),
            zip_code: fill_zip(&locale.zip_pattern, &fallback.zip_prefix, rng),
        };
    }
    // A detected city outside the catalog keeps its name; state comes from
    // the detected region when there is one.
    let state = if context.region.trim().is_empty() {
        fallback.state.clone()
    } else {
        context.region.clone()
    };
    Location {
        city: context.city.clone(),
        state,
        zip_code: fill_zip(&locale.zip_pattern, "", rng),
    }
}

/// Fill `#` with digits and `@` with uppercase letters; `prefix` characters
/// replace the leading placeholders in order.
fn fill_zip<R: Rng + ?Sized>(pattern: &str, prefix: &str, rng: &mut R) -> String {
    let mut prefix = prefix.chars();
    pattern
        .chars()
        .map(|ch| match ch {
            '#' | '@' => match prefix.next() {
                Some(fixed) => fixed,
                None if ch == '#' => char::from(DIGITS[rng.gen_range(0..DIGITS.len())]),
                None => char::from(UPPER[rng.gen_range(0..UPPER.len())]),
            },
            other => other,
        })
        .collect()
}

fn fill_phone<R: Rng + ?Sized>(pattern: &str, rng: &mut R) -> String {
    pattern
        .chars()
        .map(|ch| match ch {
            '#' => char::from(b'0' + rng.gen_range(0..10u8)),
            '%' => char::from(b'0' + rng.gen_range(2..10u8)),
            other => other,
        })
        .collect()
}

fn phone_for_locale<R: Rng + ?Sized>(locale: &LocaleRecord, rng: &mut R) -> String {
    let mut candidate = String::new();
    for _ in 0..PHONE_ATTEMPTS {
        let pattern = &locale.phone_patterns[rng.gen_range(0..locale.phone_patterns.len())];
        candidate = fill_phone(pattern, rng);
        if !is_placeholder_phone(&candidate) {
            return candidate;
        }
    }
    tracing::warn!(
        target: "geofill::generator",
        country = %locale.country,
        "phone.placeholder_exhausted"
    );
    candidate
}

fn format_address<R: Rng + ?Sized>(locale: &LocaleRecord, rng: &mut R) -> String {
    let street = &pick(&locale.streets, rng).native;
    locale
        .address_format
        .replace("{street}", street)
        .replace("{number}", &rng.gen_range(1..=999u32).to_string())
        .replace("{block}", &rng.gen_range(1..=30u32).to_string())
}

fn make_username<R: Rng + ?Sized>(first: &str, last: &str, rng: &mut R) -> String {
    let clean = |name: &str| -> String {
        name.chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase()
    };
    let first = match clean(first) {
        name if name.is_empty() => "user".to_string(),
        name => name,
    };
    let last = clean(last);
    let initial = first.chars().next().unwrap_or('u');
    match rng.gen_range(0..4) {
        0 => format!("{first}{last}{}", rng.gen_range(10..100)),
        1 => format!("{first}.{last}"),
        2 => format!("{first}_{last}{}", rng.gen_range(1..10)),
        _ => format!("{initial}{last}{}", rng.gen_range(1000..10000)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generator() -> ProfileGenerator {
        ProfileGenerator::new(LocaleCatalog::builtin())
    }

    #[test]
    fn generated_profiles_fill_every_field() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let context = LocaleContext::new("Japan", "Osaka", "");
        let profile = generator().generate_all(&context, &Settings::default(), &mut rng);
        for field in FieldName::ALL {
            assert!(!profile.get(field).is_empty(), "{field} empty");
        }
        assert_eq!(profile.get(FieldName::Country), "Japan");
        assert_eq!(profile.get(FieldName::City), "Osaka");
        assert_eq!(profile.get(FieldName::State), "大阪府");
        assert!(profile.get(FieldName::ZipCode).starts_with("530-"));
        assert!(profile.get(FieldName::Username).is_ascii());
    }

    #[test]
    fn passwords_honor_length_and_classes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let settings = Settings {
            password_length: 16,
            pwd_symbols: false,
            ..Settings::default()
        };
        for _ in 0..50 {
            let password = generate_password(&settings, &mut rng);
            assert_eq!(password.len(), 16);
            assert!(CharClasses::from_settings(&settings).satisfied_by(&password));
            assert!(!password.bytes().any(|byte| SYMBOLS.contains(&byte)));
        }
    }

    #[test]
    fn disabling_every_class_falls_back_to_lowercase_and_digits() {
        let settings = Settings {
            pwd_uppercase: false,
            pwd_lowercase: false,
            pwd_numbers: false,
            pwd_symbols: false,
            ..Settings::default()
        };
        assert_eq!(
            CharClasses::from_settings(&settings),
            CharClasses::LOWER | CharClasses::DIGITS
        );
    }

    #[test]
    fn japanese_phones_use_mobile_prefixes_without_placeholders() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let generator = generator();
        for _ in 0..200 {
            let phone = generator.generate_phone("Japan", &mut rng);
            assert!(
                phone.starts_with("090-") || phone.starts_with("080-") || phone.starts_with("070-"),
                "{phone}"
            );
            assert_eq!(phone.len(), 13);
            assert!(!is_placeholder_phone(&phone));
        }
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_phone("090-1234-1234"));
        assert!(is_placeholder_phone("090-5555-0000"));
        assert!(is_placeholder_phone("080-7777-7777"));
        assert!(is_placeholder_phone("12"));
        assert!(!is_placeholder_phone("080-3928-4719"));
    }

    #[test]
    fn email_domain_modes_drive_generated_addresses() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut generator = generator();
        generator.set_email_domain(&EmailDomainMode::Fixed("outlook.com".into()), None);
        assert_eq!(
            generator.generate_email("jdoe", "United States", &mut rng),
            "jdoe@outlook.com"
        );
        generator.set_email_domain(&EmailDomainMode::Custom, Some("@corp.example"));
        assert_eq!(
            generator.generate_email("jdoe", "United States", &mut rng),
            "jdoe@corp.example"
        );
        generator.set_email_domain(&EmailDomainMode::Temp, None);
        let email = generator.generate_email("jdoe", "Japan", &mut rng);
        let domain = email.split_once('@').map(|(_, domain)| domain).unwrap();
        let japan = generator.catalog().resolve("Japan").unwrap();
        assert!(japan.email_domains.iter().any(|known| known == domain));
    }

    #[test]
    fn location_refresh_returns_coherent_triple() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let generator = generator();
        let profile = Profile::new().with(FieldName::Country, "Germany");
        let refresh = generator.regenerate_field(
            FieldName::ZipCode,
            &profile,
            &LocaleContext::default(),
            &Settings::default(),
            &mut rng,
        );
        let FieldRefresh::Location {
            city,
            state,
            zip_code,
        } = refresh
        else {
            panic!("expected a location refresh");
        };
        let germany = generator.catalog().resolve("Germany").unwrap();
        let record = germany.city(&city).expect("catalog city");
        assert_eq!(record.state, state);
        assert!(zip_code.starts_with(&record.zip_prefix));
        assert_eq!(zip_code.len(), 5);
    }

    #[test]
    fn uk_postcodes_follow_the_pattern() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let zip = fill_zip("@@# #@@", "SW1", &mut rng);
        assert!(zip.starts_with("SW1 "));
        assert_eq!(zip.len(), 7);
    }

    #[test]
    fn birthdays_fall_inside_the_age_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let settings = Settings {
            min_age: 30,
            max_age: 30,
            ..Settings::default()
        };
        let today = Utc::now().date_naive();
        for _ in 0..20 {
            let birthday = generate_birthday(&settings, &mut rng);
            let date = NaiveDate::parse_from_str(&birthday, "%Y-%m-%d").unwrap();
            let age = today.years_since(date).unwrap();
            assert_eq!(age, 30, "{birthday}");
        }
    }
}
