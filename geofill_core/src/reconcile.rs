//! Lock-preserving bulk updates.
//!
//! Every operation that replaces profile data in bulk (full regeneration,
//! model generation, country change, archive or history restore) runs
//! through [`reconcile`]: locked values are captured first and written back
//! last, so nothing the producer does can change a locked field.

use geofill_runtime::{EmailDomainMode, FieldName, Profile, Settings};
use rand::Rng;

use crate::generator::{generate_password, ProfileGenerator};
use crate::lock::LockSet;
use crate::net::RealAddress;

pub fn reconcile<T>(
    profile: &mut Profile,
    locks: &LockSet,
    producer: impl FnOnce(&mut Profile, &LockSet) -> T,
) -> T {
    let snapshot = locks.snapshot(profile);
    let produced = producer(profile, locks);
    snapshot.restore(profile);
    produced
}

/// Local rules applied after generation, in this order: password, phone,
/// real address, email domain. Locked fields are skipped.
#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy<'a> {
    pub settings: &'a Settings,
    pub email_domain: &'a EmailDomainMode,
    pub country: &'a str,
    pub address: Option<&'a RealAddress>,
}

impl FieldPolicy<'_> {
    pub fn apply<R: Rng + ?Sized>(
        &self,
        profile: &mut Profile,
        locks: &LockSet,
        generator: &ProfileGenerator,
        rng: &mut R,
    ) {
        if !locks.contains(FieldName::Password) {
            profile.set(FieldName::Password, generate_password(self.settings, rng));
        }
        if !locks.contains(FieldName::Phone) {
            profile.set(
                FieldName::Phone,
                generator.generate_phone(self.country, rng),
            );
        }
        if let Some(found) = self.address {
            apply_address(profile, locks, found);
        }
        if !locks.contains(FieldName::Email) {
            if let Some(domain) = self.email_domain.fixed_domain() {
                let username = match profile.get(FieldName::Username) {
                    "" => "user",
                    username => username,
                };
                let email = format!("{username}@{domain}");
                profile.set(FieldName::Email, email);
            }
        }
    }
}

/// Apply a looked-up address field by field, honoring each lock.
pub fn apply_address(profile: &mut Profile, locks: &LockSet, found: &RealAddress) {
    if found.address.is_empty() {
        return;
    }
    if !locks.contains(FieldName::Address) {
        profile.set(FieldName::Address, found.address.clone());
    }
    if let Some(state) = found.state.as_ref().filter(|state| !state.is_empty()) {
        if !locks.contains(FieldName::State) {
            profile.set(FieldName::State, state.clone());
        }
    }
    if let Some(zip) = found.zip_code.as_ref().filter(|zip| !zip.is_empty()) {
        if !locks.contains(FieldName::ZipCode) {
            profile.set(FieldName::ZipCode, zip.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleCatalog;
    use crate::net::AddressSource;
    use geofill_runtime::LocaleContext;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample() -> Profile {
        Profile::new()
            .with(FieldName::FirstName, "Ada")
            .with(FieldName::Username, "ada")
            .with(FieldName::Email, "a@b.com")
            .with(FieldName::Phone, "555")
    }

    #[test]
    fn locked_fields_survive_wholesale_replacement() {
        let mut profile = sample();
        let locks: LockSet = [FieldName::Email, FieldName::FirstName].into_iter().collect();
        reconcile(&mut profile, &locks, |profile, _| {
            *profile = Profile::new()
                .with(FieldName::FirstName, "Grace")
                .with(FieldName::Email, "grace@example.com")
                .with(FieldName::City, "Arlington");
        });
        assert_eq!(profile.get(FieldName::FirstName), "Ada");
        assert_eq!(profile.get(FieldName::Email), "a@b.com");
        assert_eq!(profile.get(FieldName::City), "Arlington");
    }

    #[test]
    fn producer_result_is_returned() {
        let mut profile = sample();
        let changed = reconcile(&mut profile, &LockSet::new(), |profile, _| {
            profile.set(FieldName::Gender, "female");
            1
        });
        assert_eq!(changed, 1);
    }

    #[test]
    fn domain_override_loses_to_a_lock() {
        let generator = ProfileGenerator::new(LocaleCatalog::builtin());
        let settings = Settings::default();
        let domain = EmailDomainMode::Fixed("gmail.com".into());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut profile = sample();
        let locks: LockSet = [FieldName::Email].into_iter().collect();

        reconcile(&mut profile, &locks, |profile, locks| {
            *profile = generator.generate_all(&LocaleContext::default(), &settings, &mut rng);
            FieldPolicy {
                settings: &settings,
                email_domain: &domain,
                country: "United States",
                address: None,
            }
            .apply(profile, locks, &generator, &mut rng);
        });
        assert_eq!(profile.get(FieldName::Email), "a@b.com");
    }

    #[test]
    fn fixed_domain_rewrites_unlocked_email() {
        let generator = ProfileGenerator::new(LocaleCatalog::builtin());
        let settings = Settings::default();
        let domain = EmailDomainMode::Fixed("outlook.com".into());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut profile = Profile::new()
            .with(FieldName::Username, "jdoe")
            .with(FieldName::Email, "jdoe@yahoo.com");
        FieldPolicy {
            settings: &settings,
            email_domain: &domain,
            country: "United States",
            address: None,
        }
        .apply(&mut profile, &LockSet::new(), &generator, &mut rng);
        assert_eq!(profile.get(FieldName::Email), "jdoe@outlook.com");
    }

    #[test]
    fn custom_and_temp_modes_keep_the_produced_email() {
        let generator = ProfileGenerator::new(LocaleCatalog::builtin());
        let settings = Settings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for mode in [EmailDomainMode::Custom, EmailDomainMode::Temp] {
            let mut profile = sample();
            FieldPolicy {
                settings: &settings,
                email_domain: &mode,
                country: "United States",
                address: None,
            }
            .apply(&mut profile, &LockSet::new(), &generator, &mut rng);
            assert_eq!(profile.get(FieldName::Email), "a@b.com");
        }
    }

    #[test]
    fn address_parts_honor_their_own_locks() {
        let mut profile = Profile::new()
            .with(FieldName::Address, "old street")
            .with(FieldName::State, "old state")
            .with(FieldName::ZipCode, "00000");
        let locks: LockSet = [FieldName::State].into_iter().collect();
        let found = RealAddress {
            address: "1 New Road".into(),
            state: Some("New State".into()),
            zip_code: Some("12345".into()),
            source: AddressSource::OpenStreetMap,
        };
        apply_address(&mut profile, &locks, &found);
        assert_eq!(profile.get(FieldName::Address), "1 New Road");
        assert_eq!(profile.get(FieldName::State), "old state");
        assert_eq!(profile.get(FieldName::ZipCode), "12345");
    }
}
