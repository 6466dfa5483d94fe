use geofill_core::{
    reconcile, FieldPolicy, LocaleCatalog, LockSet, ProfileGenerator,
};
use geofill_runtime::{EmailDomainMode, FieldName, LocaleContext, Settings};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{rngs::SmallRng, SeedableRng};

fn bench_generate(c: &mut Criterion) {
    let generator = ProfileGenerator::new(LocaleCatalog::builtin());
    let settings = Settings::default();
    let mut group = c.benchmark_group("generate_all");

    for country in ["United States", "Japan", "Germany", "China"] {
        let context = LocaleContext::new(country, "", "");
        group.bench_with_input(BenchmarkId::new("country", country), &context, |b, context| {
            let mut rng = SmallRng::seed_from_u64(7);
            b.iter(|| generator.generate_all(context, &settings, &mut rng));
        });
    }

    group.finish();
}

fn bench_regenerate_locked(c: &mut Criterion) {
    let generator = ProfileGenerator::new(LocaleCatalog::builtin());
    let settings = Settings::default();
    let domain = EmailDomainMode::default();
    let context = LocaleContext::new("United States", "New York", "");
    let locks: LockSet = [FieldName::Email, FieldName::Phone, FieldName::Address]
        .into_iter()
        .collect();
    let mut rng = SmallRng::seed_from_u64(11);
    let seed = generator.generate_all(&context, &settings, &mut rng);

    c.bench_function("regenerate_with_locks", |b| {
        b.iter_batched(
            || seed.clone(),
            |mut profile| {
                let generated = generator.generate_all(&context, &settings, &mut rng);
                let policy = FieldPolicy {
                    settings: &settings,
                    email_domain: &domain,
                    country: "United States",
                    address: None,
                };
                reconcile(&mut profile, &locks, |profile, locks| {
                    *profile = generated;
                    policy.apply(profile, locks, &generator, &mut rng);
                });
                profile
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(generate_benches, bench_generate, bench_regenerate_locked);
criterion_main!(generate_benches);
