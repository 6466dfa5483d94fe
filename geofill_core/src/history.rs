use chrono::{DateTime, Datelike, Local, Utc};
use geofill_runtime::{FieldName, HistoryItem, MAX_HISTORY_ITEMS};

/// Put `item` first, dropping any older entry with the same email and
/// keeping at most [`MAX_HISTORY_ITEMS`].
pub fn record_history(history: &mut Vec<HistoryItem>, item: HistoryItem) {
    let email = item.data.get(FieldName::Email);
    history.retain(|existing| existing.data.get(FieldName::Email) != email);
    history.insert(0, item);
    history.truncate(MAX_HISTORY_ITEMS);
}

pub fn remove_history(history: &mut Vec<HistoryItem>, id: i64) -> bool {
    let before = history.len();
    history.retain(|item| item.id != id);
    history.len() != before
}

/// Short relative label for a history timestamp.
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_minutes() < 1 {
        "刚刚".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}分钟前", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}小时前", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}天前", elapsed.num_days())
    } else {
        let local = at.with_timezone(&Local);
        format!("{}/{}", local.month(), local.day())
    }
}
