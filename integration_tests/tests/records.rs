mod common;

use common::{enable_ai, service, FakeBridge, FakeTransport};
use geofill_core::runtime::{
    parse_command_line, ArchiveAction, FieldName, FillMode, HistoryAction, PageMessage,
    ProfileCommand,
};
use geofill_core::{dispatch, ArchiveUpsert, GeofillError};
use serde_json::json;

#[tokio::test]
async fn history_deduplicates_by_email_and_keeps_newest_first() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;

    service.set_field(FieldName::Email, "first@x.test").unwrap();
    service.fill_form(FillMode::Normal).await.unwrap();
    service.set_field(FieldName::Email, "second@x.test").unwrap();
    service.fill_form(FillMode::Normal).await.unwrap();
    service.set_field(FieldName::Email, "first@x.test").unwrap();
    service.set_field(FieldName::City, "Boston").unwrap();
    service.fill_form(FillMode::Normal).await.unwrap();

    let history = service.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].data.get(FieldName::Email), "first@x.test");
    assert_eq!(history[0].data.get(FieldName::City), "Boston");
    assert_eq!(history[1].data.get(FieldName::Email), "second@x.test");

    let event = dispatch(&mut service, ProfileCommand::History(HistoryAction::List)).await;
    assert_eq!(event.lines.len(), 2);
    assert!(event.lines[0].contains("first@x.test"));
    assert!(event.lines[0].ends_with("刚刚"));
}

#[tokio::test]
async fn history_keeps_the_ten_most_recent() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;
    for index in 0..15 {
        service
            .set_field(FieldName::Email, &format!("user{index}@x.test"))
            .unwrap();
        assert!(service.save_to_history());
    }
    let history = service.history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].data.get(FieldName::Email), "user14@x.test");

    service.set_field(FieldName::FirstName, "").unwrap();
    assert!(!service.save_to_history());

    let event = dispatch(&mut service, parse_command_line("history clear").unwrap()).await;
    assert_eq!(event.toasts, vec!["历史记录已清空".to_string()]);
    assert!(service.history().is_empty());
}

#[tokio::test]
async fn archives_upsert_by_name_and_restore_with_locks() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;

    service.set_field(FieldName::City, "Austin").unwrap();
    assert_eq!(service.save_archive("work").unwrap(), ArchiveUpsert::Inserted);
    service.set_field(FieldName::City, "Denver").unwrap();
    assert_eq!(service.save_archive(" work ").unwrap(), ArchiveUpsert::Updated);
    assert_eq!(service.archives().len(), 1);
    assert_eq!(service.archives()[0].data.get(FieldName::City), "Denver");

    assert!(matches!(
        service.save_archive("   "),
        Err(GeofillError::Validation(_))
    ));

    service.set_field(FieldName::City, "Miami").unwrap();
    service.set_field(FieldName::Phone, "212-555-0199").unwrap();
    service.lock(FieldName::Phone);
    let event = dispatch(
        &mut service,
        ProfileCommand::Archive(ArchiveAction::Load { index: 0 }),
    )
    .await;
    assert_eq!(event.toasts, vec!["已加载存档（1个锁定字段已保留）".to_string()]);
    assert_eq!(service.profile().get(FieldName::City), "Denver");
    assert_eq!(service.profile().get(FieldName::Phone), "212-555-0199");

    let event = dispatch(
        &mut service,
        ProfileCommand::Archive(ArchiveAction::Delete { index: 3 }),
    )
    .await;
    assert_eq!(event.toasts, vec!["存档不存在".to_string()]);
    let event = dispatch(
        &mut service,
        ProfileCommand::Archive(ArchiveAction::Delete { index: 0 }),
    )
    .await;
    assert_eq!(event.toasts, vec!["存档 \"work\" 已删除".to_string()]);
    assert!(service.archives().is_empty());
}

#[tokio::test]
async fn smart_fill_sanitizes_the_model_mapping() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;
    service.change_country("Japan").unwrap();
    enable_ai(&mut service);

    bridge.set_scan(json!({
        "fields": [
            { "id": "f1", "type": "text", "name": "sei", "label": "姓", "required": true },
            { "id": "f2", "type": "password", "name": "pw", "label": "", "required": true },
            { "id": "f3", "type": "tel", "name": "tel", "label": "電話番号", "required": false },
            { "id": "f4", "type": "text", "name": "zip", "label": "郵便番号", "required": false },
            { "id": "f5", "type": "email", "name": "mail", "label": "", "required": true }
        ],
        "pageContext": { "title": "会員登録", "language": "ja" }
    }));
    transport.route_chat(
        r#"{"f1": "山田", "f2": "１２３", "f3": "０９０ー１２３４ー１２３４", "f4": "〒５３０－０００１", "f5": "ｔａｒｏ＠ｅｘａｍｐｌｅ．ｊｐ"}"#,
    );

    let done = service.fill_form(FillMode::Smart).await.unwrap();
    assert!(done.smart);
    assert!(done.history_saved);

    let sent = bridge.sent();
    let Some(PageMessage::FillFormSmart { data }) = sent.last() else {
        panic!("expected a smart fill, got {sent:?}");
    };
    assert_eq!(data["f1"], json!("山田"));
    assert_eq!(data["f2"], json!(service.profile().get(FieldName::Password)));
    assert_eq!(data["f3"], json!(service.profile().get(FieldName::Phone)));
    assert_eq!(data["f4"], json!("530-0001"));
    assert_eq!(data["f5"], json!("taro@example.jp"));

    let posted = transport.posted();
    let temperature = posted[0]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn smart_fill_without_fields_reports_and_sends_nothing_else() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;
    enable_ai(&mut service);

    let event = dispatch(&mut service, ProfileCommand::FillForm(FillMode::Smart)).await;
    assert!(!event.is_success());
    assert_eq!(event.toasts, vec!["未找到可见的表单字段".to_string()]);
    assert_eq!(bridge.sent(), vec![PageMessage::ScanForm]);
    assert!(service.history().is_empty());
}

#[tokio::test]
async fn smart_fill_without_ai_sends_the_profile_as_is() {
    let transport = FakeTransport::new();
    let bridge = FakeBridge::new();
    let mut service = service(&transport, &bridge);
    service.init().await;

    let event = dispatch(&mut service, ProfileCommand::FillForm(FillMode::Smart)).await;
    assert_eq!(event.toasts, vec!["普通填表完成".to_string()]);
    let sent = bridge.sent();
    assert_eq!(
        sent,
        vec![PageMessage::FillForm {
            data: service.profile().clone()
        }]
    );
}
