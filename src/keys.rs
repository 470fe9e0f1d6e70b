//! Stable dedup keys derived from record contents.

use chrono::{Local, TimeZone};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Key shared by a clipping and its original lines. Two blocks with the same
/// time and location are the same clipping whatever their content.
pub fn clipping_key(time: &str, location: &str) -> String {
    format!("{}|{}", time, location)
}

/// Device vocabulary key: the word followed by the raw millisecond timestamp,
/// concatenated as text.
pub fn vocab_key(word: &str, millis: i64) -> String {
    format!("{}{}", word, millis)
}

/// Lookups are keyed by their normalized timestamp alone, so two lookups in
/// the same second collide.
pub fn lookup_key(timestamp: &str) -> &str {
    timestamp
}

/// Renders a Unix millisecond timestamp as local time. Out-of-range values
/// render as an empty string.
pub fn format_millis_local(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
