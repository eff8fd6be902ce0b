use chrono::NaiveDateTime;

use crate::models::{ItemIdentifier, ItemRecord};

const DISPLAY_TIME: &str = "%d.%m.%Y %H:%M:%S";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Caption announcing that the alliance switched to `record`.
pub fn change_caption(record: &ItemRecord, alliance_url: &str, now: NaiveDateTime) -> String {
    format!(
        "🔔 <b>Alliance title changed!</b>\n\n\
         📚 <code>{}</code>\n\n\
         🔗 <a href=\"{}\">Open the alliance page</a>\n\n\
         ⏰ {}",
        escape_html(&record.title),
        escape_html(alliance_url),
        now.format(DISPLAY_TIME)
    )
}

pub fn started_caption(record: &ItemRecord, alliance_url: &str, now: NaiveDateTime) -> String {
    format!(
        "🚀 <b>Monitoring started</b>\n\n{}",
        change_caption(record, alliance_url, now)
    )
}

pub fn started_without_details_caption(identifier: &ItemIdentifier) -> String {
    format!(
        "🚀 <b>Monitoring started</b>\n\nCurrent title: {}\n(details could not be fetched)",
        escape_html(identifier.as_str())
    )
}

pub fn degraded_change_caption(identifier: &ItemIdentifier) -> String {
    format!(
        "🔔 <b>Title changed!</b>\n\nNew title: {}\n(details could not be fetched)",
        escape_html(identifier.as_str())
    )
}

pub fn initial_miss_caption() -> String {
    "⚠️ Could not read the alliance's current title".to_string()
}

pub fn stopped_caption() -> String {
    "⏹️ Monitoring stopped".to_string()
}

pub fn network_failure_caption() -> String {
    "❌ Network error. Monitoring stopped.".to_string()
}
