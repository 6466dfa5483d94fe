//! Command routing for front ends.
//!
//! [`dispatch`] runs one [`ProfileCommand`] against the service and turns
//! the outcome into toasts plus optional listing lines. Errors never escape;
//! they become failure toasts.

use chrono::Utc;
use geofill_runtime::{ArchiveAction, FieldName, FillMode, HistoryAction, ProfileCommand};
use rand::Rng;

use crate::archive::ArchiveUpsert;
use crate::error::GeofillError;
use crate::history::format_relative_time;
use crate::service::{ProfileService, Regenerated, Restored, SessionStart};

const ERROR_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEvent {
    pub outcome: Outcome,
    pub toasts: Vec<String>,
    /// Listing or clipboard text for the front end to show.
    pub lines: Vec<String>,
}

impl ServiceEvent {
    fn ok(toast: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            toasts: vec![toast.into()],
            lines: Vec::new(),
        }
    }

    fn quiet() -> Self {
        Self {
            outcome: Outcome::Success,
            toasts: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn failed(toast: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            toasts: vec![toast.into()],
            lines: Vec::new(),
        }
    }

    fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }

    fn and_toast(mut self, toast: impl Into<String>) -> Self {
        self.toasts.push(toast.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Generic failure wording: `{context}失败: {message}` with the message cut
/// to a short preview.
pub fn failure_toast(context: &str, err: &GeofillError) -> String {
    if let GeofillError::Validation(message) = err {
        return message.clone();
    }
    let message: String = err.to_string().chars().take(ERROR_PREVIEW_CHARS).collect();
    format!("{context}失败: {message}")
}

/// Toast for the start of a session.
pub fn session_event(start: &SessionStart) -> ServiceEvent {
    match start {
        SessionStart::Restored => ServiceEvent::quiet(),
        SessionStart::Located(refresh) => {
            let event = ServiceEvent::ok(refresh.label.clone());
            match refresh.address_source {
                Some(source) => event.and_toast(format!("已获取真实地址 ({})", source.label())),
                None => event,
            }
        }
    }
}

pub async fn dispatch<R: Rng>(
    service: &mut ProfileService<R>,
    command: ProfileCommand,
) -> ServiceEvent {
    tracing::debug!(target: "geofill::dispatch", ?command, "command.received");
    match command {
        ProfileCommand::Show => ServiceEvent::quiet().with_lines(profile_lines(service)),
        ProfileCommand::Regenerate => match service.regenerate().await {
            Ok(done) => regenerated_event(done),
            Err(err) if service.ai_active() => {
                ServiceEvent::failed(format!("AI 生成失败: {err}"))
            }
            Err(err) => ServiceEvent::failed(failure_toast("生成数据", &err)),
        },
        ProfileCommand::GenerateWithAi => {
            if !service.settings().ai_ready() {
                return ServiceEvent::failed("请先在设置中启用 AI 并填写 API Key");
            }
            match service.generate_with_ai().await {
                Ok(done) => regenerated_event(done),
                Err(err) => ServiceEvent::failed(format!("AI 生成失败: {err}")),
            }
        }
        ProfileCommand::RefreshField(field) => match service.refresh_field(field) {
            Ok(()) => ServiceEvent::quiet().with_lines(vec![field_line(service, field)]),
            Err(GeofillError::Locked(field)) => {
                ServiceEvent::failed(format!("{field} 已锁定，无法刷新"))
            }
            Err(err) => ServiceEvent::failed(failure_toast("刷新字段", &err)),
        },
        ProfileCommand::Lock(field) => {
            service.lock(field);
            ServiceEvent::ok(format!("{field} 已锁定"))
        }
        ProfileCommand::Unlock(field) => {
            service.unlock(field);
            ServiceEvent::ok(format!("{field} 已解锁"))
        }
        ProfileCommand::ToggleLock(field) => {
            if service.toggle_lock(field) {
                ServiceEvent::ok(format!("{field} 已锁定"))
            } else {
                ServiceEvent::ok(format!("{field} 已解锁"))
            }
        }
        ProfileCommand::SetField { field, value } => match service.set_field(field, &value) {
            Ok(()) => ServiceEvent::quiet().with_lines(vec![field_line(service, field)]),
            Err(err) => ServiceEvent::failed(failure_toast("修改字段", &err)),
        },
        ProfileCommand::ChangeCountry(name) => match service.change_country(&name) {
            Ok(country) => ServiceEvent::ok(format!("已切换到 {country}")),
            Err(err) => ServiceEvent::failed(failure_toast("切换国家", &err)),
        },
        ProfileCommand::EmailDomain {
            mode,
            custom_domain,
        } => match service.set_email_domain(mode, custom_domain) {
            Ok(change) if change.temp_email_fallback => {
                ServiceEvent::ok("临时邮箱服务不可用，已使用普通邮箱")
            }
            Ok(change) if change.email_updated => ServiceEvent::ok(format!(
                "邮箱已更新: {}",
                service.profile().get(FieldName::Email)
            )),
            Ok(_) => ServiceEvent::ok("邮箱后缀已更新"),
            Err(err) => ServiceEvent::failed(failure_toast("设置邮箱后缀", &err)),
        },
        ProfileCommand::RefreshLocation => {
            let refresh = service.refresh_location().await;
            let event = ServiceEvent::ok("已更新位置信息").with_lines(vec![refresh.label.clone()]);
            match refresh.address_source {
                Some(source) => event.and_toast(format!("已获取真实地址 ({})", source.label())),
                None => event,
            }
        }
        ProfileCommand::Archive(action) => archive_event(service, action),
        ProfileCommand::History(action) => history_event(service, action),
        ProfileCommand::FillForm(mode) => match service.fill_form(mode).await {
            Ok(done) if done.smart => ServiceEvent::ok("AI 智能填写完成"),
            Ok(_) => ServiceEvent::ok("普通填表完成"),
            Err(err @ GeofillError::Validation(_)) => ServiceEvent::failed(err.to_string()),
            Err(err) => {
                tracing::warn!(
                    target: "geofill::dispatch",
                    smart = mode == FillMode::Smart,
                    error = %err,
                    "fill.failed"
                );
                ServiceEvent::failed(format!("填写失败: {err}"))
            }
        },
        ProfileCommand::TestAi => match service.test_ai().await {
            Ok(()) => ServiceEvent::ok("✅ 连接成功"),
            Err(err) => ServiceEvent::failed(format!("❌ 连接失败: {err}")),
        },
        ProfileCommand::Setting { key, value } => match service.update_setting(&key, &value) {
            Ok(()) => ServiceEvent::ok("设置已保存"),
            Err(err) => ServiceEvent::failed(failure_toast("保存设置", &err)),
        },
        ProfileCommand::SetUseAi(enabled) => {
            service.set_use_ai(enabled);
            if enabled && !service.settings().ai_ready() {
                ServiceEvent::ok("AI 模式已开启").and_toast("请先在设置中启用 AI 并填写 API Key")
            } else if enabled {
                ServiceEvent::ok("AI 模式已开启")
            } else {
                ServiceEvent::ok("AI 模式已关闭")
            }
        }
        ProfileCommand::Theme(choice) => {
            let theme = service.set_theme(choice);
            ServiceEvent::quiet().with_lines(vec![format!("theme: {theme:?}").to_lowercase()])
        }
        ProfileCommand::CopyAll => {
            let text = service.summary_text();
            ServiceEvent::ok("已复制全部信息").with_lines(text.lines().map(str::to_string).collect())
        }
    }
}

fn regenerated_event(done: Regenerated) -> ServiceEvent {
    let event = if done.via_ai {
        ServiceEvent::ok("AI 生成成功")
    } else {
        ServiceEvent::ok("数据已生成")
    };
    let event = match done.address_source {
        Some(source) => event.and_toast(format!("已获取真实地址 ({})", source.label())),
        None => event,
    };
    if done.temp_email_fallback {
        event.and_toast("临时邮箱服务不可用，已使用普通邮箱")
    } else {
        event
    }
}

fn restored_toast(restored: &Restored, plain: String, kind: &str) -> String {
    if restored.locked_kept > 0 {
        format!("已加载{kind}（{}个锁定字段已保留）", restored.locked_kept)
    } else {
        plain
    }
}

fn archive_event<R: Rng>(service: &mut ProfileService<R>, action: ArchiveAction) -> ServiceEvent {
    match action {
        ArchiveAction::Save { name } => match service.save_archive(&name) {
            Ok(ArchiveUpsert::Updated) => ServiceEvent::ok(format!("存档 \"{}\" 已更新", name.trim())),
            Ok(ArchiveUpsert::Inserted) => ServiceEvent::ok(format!("存档 \"{}\" 已保存", name.trim())),
            Err(err) => ServiceEvent::failed(failure_toast("保存存档", &err)),
        },
        ArchiveAction::Load { index } => match service.load_archive(index) {
            Ok(restored) => {
                let plain = format!(
                    "已加载存档 \"{}\"",
                    restored.name.as_deref().unwrap_or_default()
                );
                ServiceEvent::ok(restored_toast(&restored, plain, "存档"))
            }
            Err(err) => ServiceEvent::failed(failure_toast("加载存档", &err)),
        },
        ArchiveAction::Delete { index } => match service.delete_archive(index) {
            Ok(name) => ServiceEvent::ok(format!("存档 \"{name}\" 已删除")),
            Err(err) => ServiceEvent::failed(failure_toast("删除存档", &err)),
        },
        ArchiveAction::List => {
            let archives = service.archives();
            if archives.is_empty() {
                return ServiceEvent::quiet().with_lines(vec!["暂无存档".to_string()]);
            }
            let lines = archives
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    format!(
                        "[{index}] {} | {} {} | {}",
                        entry.name,
                        entry.data.get(FieldName::FirstName),
                        entry.data.get(FieldName::LastName),
                        entry.data.get(FieldName::Email)
                    )
                })
                .collect();
            ServiceEvent::quiet().with_lines(lines)
        }
    }
}

fn history_event<R: Rng>(service: &mut ProfileService<R>, action: HistoryAction) -> ServiceEvent {
    match action {
        HistoryAction::Load { id } => match service.load_history(id) {
            Ok(restored) => ServiceEvent::ok(restored_toast(
                &restored,
                "已加载历史记录".to_string(),
                "历史记录",
            )),
            Err(err) => ServiceEvent::failed(failure_toast("加载历史记录", &err)),
        },
        HistoryAction::Delete { id } => {
            if service.delete_history(id) {
                ServiceEvent::ok("已删除")
            } else {
                ServiceEvent::failed("历史记录不存在")
            }
        }
        HistoryAction::Clear => {
            service.clear_history();
            ServiceEvent::ok("历史记录已清空")
        }
        HistoryAction::List => {
            let history = service.history();
            if history.is_empty() {
                return ServiceEvent::quiet().with_lines(vec!["暂无历史记录".to_string()]);
            }
            let now = Utc::now();
            let lines = history
                .iter()
                .map(|item| {
                    format!(
                        "[{}] {} {} | {} | {} | {}",
                        item.id,
                        item.data.get(FieldName::FirstName),
                        item.data.get(FieldName::LastName),
                        item.data.get(FieldName::Email),
                        item.country,
                        format_relative_time(item.timestamp, now)
                    )
                })
                .collect();
            ServiceEvent::quiet().with_lines(lines)
        }
    }
}

fn field_line<R: Rng>(service: &ProfileService<R>, field: FieldName) -> String {
    let marker = if service.locks().contains(field) { "🔒" } else { "  " };
    format!("{marker} {field}: {}", service.profile().get(field))
}

/// Current state as display lines: location, then every field with its lock.
pub fn profile_lines<R: Rng>(service: &ProfileService<R>) -> Vec<String> {
    let mut lines = vec![service.location_label().to_string()];
    lines.extend(FieldName::ALL.iter().map(|field| field_line(service, *field)));
    lines
}
