//! Relative timestamps for notification rows.

use chrono::{DateTime, TimeZone, Utc};

/// Parse a wire timestamp: epoch milliseconds or RFC 3339
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn elapsed_secs(created_at: &str, now: DateTime<Utc>) -> Option<i64> {
    parse_timestamp(created_at).map(|created| (now - created).num_seconds().max(0))
}

/// `now`, `5m`, `3h`, `2d`; empty when the timestamp cannot be read
pub fn time_ago_compact(created_at: &str, now: DateTime<Utc>) -> String {
    match elapsed_secs(created_at, now) {
        Some(s) if s < 60 => "now".to_string(),
        Some(s) if s < 3600 => format!("{}m", s / 60),
        Some(s) if s < 86400 => format!("{}h", s / 3600),
        Some(s) => format!("{}d", s / 86400),
        None => String::new(),
    }
}

/// `Just now`, `5m ago`, `3h ago`, `2d ago`; empty when the timestamp cannot be read
pub fn time_ago_long(created_at: &str, now: DateTime<Utc>) -> String {
    match elapsed_secs(created_at, now) {
        Some(s) if s < 60 => "Just now".to_string(),
        Some(s) if s < 3600 => format!("{}m ago", s / 60),
        Some(s) if s < 86400 => format!("{}h ago", s / 3600),
        Some(s) => format!("{}d ago", s / 86400),
        None => String::new(),
    }
}
