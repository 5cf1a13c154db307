//! Date keys for grouping runs
//!
//! Timestamps are UTC upstream, so grouping takes the calendar date exactly
//! as written and never shifts timezones.

use chrono::NaiveDate;

/// Format of every date key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reduce a captured timestamp to its `YYYY-MM-DD` key.
///
/// Accepts ISO-8601 (`2025-08-29T10:15:00.123456Z`, `...+02:00`) and the
/// legacy space-separated form (`2025-08-29 10:15:00[.123456]`). Returns
/// `None` when the leading date is missing or not a real calendar date.
pub fn date_key(timestamp: &str) -> Option<String> {
    parse_date(timestamp).map(|date| date.format(DATE_FORMAT).to_string())
}

/// Parse the leading calendar date of a timestamp
pub fn parse_date(timestamp: &str) -> Option<NaiveDate> {
    let timestamp = timestamp.trim();
    let prefix = timestamp.get(..10)?;

    match timestamp.as_bytes().get(10) {
        None | Some(b'T' | b't' | b' ') => {}
        Some(_) => return None,
    }

    NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()
}

/// Every date from `start` to `end`, inclusive
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}
