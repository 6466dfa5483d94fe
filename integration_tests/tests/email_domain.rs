mod common;

use common::{service, FakeBridge, FakeTransport};
use geofill_core::runtime::{parse_command_line, EmailDomainMode, FieldName};
use geofill_core::{dispatch, GeofillError};

#[tokio::test]
async fn fixed_domains_apply_to_regeneration() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;

    service
        .set_email_domain(EmailDomainMode::Fixed("outlook.com".into()), None)
        .unwrap();
    for _ in 0..5 {
        service.regenerate().await.unwrap();
        let username = service.profile().get(FieldName::Username).to_string();
        assert_eq!(
            service.profile().get(FieldName::Email),
            format!("{username}@outlook.com")
        );
    }
}

#[tokio::test]
async fn custom_domain_applies_to_later_generations() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;

    let command = parse_command_line("domain custom @corp.example").unwrap();
    let event = dispatch(&mut service, command).await;
    assert!(event.is_success());
    assert_eq!(service.custom_domain(), Some("corp.example"));
    assert!(service
        .profile()
        .get(FieldName::Email)
        .ends_with("@corp.example"));

    service.change_country("Germany").unwrap();
    assert!(service
        .profile()
        .get(FieldName::Email)
        .ends_with("@corp.example"));
}

#[tokio::test]
async fn temp_mode_falls_back_to_locale_domains_with_a_notice() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;
    service.change_country("Japan").unwrap();

    let change = service
        .set_email_domain(EmailDomainMode::Temp, None)
        .unwrap();
    assert!(change.email_updated);
    assert!(change.temp_email_fallback);
    let domain = service
        .profile()
        .get(FieldName::Email)
        .rsplit('@')
        .next()
        .unwrap()
        .to_string();
    let japan = service.catalog().resolve("Japan").unwrap();
    assert!(japan.email_domains.contains(&domain), "{domain}");

    let event = dispatch(&mut service, parse_command_line("regen").unwrap()).await;
    assert!(event
        .toasts
        .iter()
        .any(|toast| toast == "临时邮箱服务不可用，已使用普通邮箱"));
}

#[tokio::test]
async fn locked_email_ignores_domain_changes() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;
    service.set_field(FieldName::Email, "mine@private.test").unwrap();
    service.lock(FieldName::Email);

    let change = service
        .set_email_domain(EmailDomainMode::Fixed("yahoo.com".into()), None)
        .unwrap();
    assert!(!change.email_updated);
    assert_eq!(service.profile().get(FieldName::Email), "mine@private.test");

    assert!(matches!(
        service.set_email_domain(EmailDomainMode::Custom, None),
        Err(GeofillError::Validation(_))
    ));
}
