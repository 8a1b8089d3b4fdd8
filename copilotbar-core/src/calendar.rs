//! Calendar helpers.
//!
//! History keys are ISO dates (`YYYY-MM-DD`) taken from the local clock, so
//! lexicographic order of keys is also chronological order.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;

/// Format used for history keys and `daily_usage` lookups.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Returns the history key for a date.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a history key back into a date.
///
/// # Errors
///
/// Returns `CoreError::InvalidDate` if `key` is not a `YYYY-MM-DD` date.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|e| CoreError::InvalidDate(format!("{key}: {e}")))
}

/// Number of days in the month containing `date` (28 to 31).
pub fn days_in_month(date: NaiveDate) -> u32 {
    (28..=31)
        .rev()
        .find(|&day| date.with_day(day).is_some())
        .unwrap_or(28)
}

/// Even per-day share of a monthly allowance: `floor(total / days_in_month)`.
pub fn daily_share(total: u64, date: NaiveDate) -> u64 {
    total / u64::from(days_in_month(date))
}
