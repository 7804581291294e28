//! Timestamp parsing for extract time columns.
//!
//! Extracts write dates in a handful of layouts depending on the export tool.
//! Everything is normalised to naive timestamps stored as milliseconds since
//! the Unix epoch, which is what `Datetime(ms)` columns hold.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 86_400_000;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parses a date or datetime string.
///
/// Returns `None` for empty or unrecognised input; callers treat that as a
/// missing value rather than an error.
///
/// # Examples
///
/// ```
/// use hmis_common::parse_timestamp;
///
/// let parsed = parse_timestamp("2011-01-13").unwrap();
/// assert_eq!(parsed.to_string(), "2011-01-13 00:00:00");
/// assert!(parse_timestamp("not a date").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Parses a date or datetime string into epoch milliseconds.
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    parse_timestamp(value).map(|parsed| parsed.and_utc().timestamp_millis())
}

/// Formats epoch milliseconds as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp_ms(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}
