//! Usage-related types.
//!
//! This module contains types related to usage tracking:
//! - [`UsageInfo`] - Raw, schema-optional provider response
//! - [`SyntheticEstimate`] - Stand-in figures when no endpoint answers
//! - [`UsageSnapshot`] - Derived summary handed to the front end
//! - [`RawData`] - What a snapshot was derived from

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::source::UsageSource;
use crate::calendar::{daily_share, date_key};

/// Monthly completion allowance assumed when the provider does not report one.
pub const DEFAULT_MONTHLY_LIMIT: u64 = 2000;

// ============================================================================
// Usage Info
// ============================================================================

/// Raw usage metrics as returned by the provider.
///
/// Every field is optional. A count that is not a non-negative whole number
/// (null, negative, fractional, a string) reads as absent, and such entries
/// are dropped from `daily_usage`. Fields this crate does not understand are
/// kept in `extra` so the diagnostic payload survives intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    /// Monthly completion limit.
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_completions_limit: Option<u64>,

    /// Completions used so far this month.
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_completions_used: Option<u64>,

    /// Per-day usage counts keyed by `YYYY-MM-DD`.
    #[serde(
        default,
        deserialize_with = "lenient_daily",
        skip_serializing_if = "Option::is_none"
    )]
    pub daily_usage: Option<BTreeMap<String, u64>>,

    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UsageInfo {
    /// Monthly limit, or [`DEFAULT_MONTHLY_LIMIT`] when absent.
    pub fn limit_or_default(&self) -> u64 {
        self.total_completions_limit.unwrap_or(DEFAULT_MONTHLY_LIMIT)
    }

    /// Monthly consumption, or 0 when absent.
    pub fn used_or_default(&self) -> u64 {
        self.total_completions_used.unwrap_or(0)
    }

    /// The provider's count for a given day, if it reported one.
    pub fn daily_for(&self, key: &str) -> Option<u64> {
        self.daily_usage.as_ref()?.get(key).copied()
    }
}

/// Reads a JSON number as a count. Whole floats such as `450.0` count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(count_from(&Value::deserialize(deserializer)?))
}

fn lenient_daily<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, u64>>, D::Error> {
    let Value::Object(days) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        days.iter()
            .filter_map(|(day, count)| Some((day.clone(), count_from(count)?)))
            .collect(),
    ))
}

// ============================================================================
// Synthetic Estimate
// ============================================================================

/// Randomized figures used when neither metering endpoint is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticEstimate {
    /// Estimated monthly consumption.
    pub used: u64,
    /// Estimated usage today.
    pub daily: u64,
}

// ============================================================================
// Raw Data
// ============================================================================

/// Marker stored in place of provider data for synthetic snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackMarker {
    /// Always `true`; kept for consumers that check `rawData.fallback`.
    pub fallback: bool,
    /// Login of the authenticated principal.
    pub user: String,
}

/// The payload a snapshot was derived from. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawData {
    /// Synthetic estimate marker.
    Fallback(FallbackMarker),
    /// Provider response.
    Provider(UsageInfo),
}

impl RawData {
    /// Returns true for the synthetic marker.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// A fully derived, immutable usage summary from one refresh.
///
/// Snapshots are only built through [`UsageSnapshot::from_usage_info`] and
/// [`UsageSnapshot::estimated`]; fields are read through accessors so
/// `remaining`, `daily_limit` and `over_limit` can never drift from the
/// values they are derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    total: u64,
    used: u64,
    remaining: i64,
    daily: u64,
    daily_limit: u64,
    over_limit: bool,
    raw_data: RawData,
    source: UsageSource,
    fetched_at: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Derives a snapshot from a provider response.
    ///
    /// `recorded_today` is the locally stored count for `today`; it is used
    /// only when the response carries no entry for today's date.
    pub fn from_usage_info(
        info: UsageInfo,
        source: UsageSource,
        today: NaiveDate,
        recorded_today: u64,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let total = info.limit_or_default();
        let used = info.used_or_default();
        let daily = info.daily_for(&date_key(today)).unwrap_or(recorded_today);
        let daily_limit = daily_share(total, today);

        Self {
            total,
            used,
            remaining: signed(total) - signed(used),
            daily,
            daily_limit,
            over_limit: daily > daily_limit,
            raw_data: RawData::Provider(info),
            source,
            fetched_at,
        }
    }

    /// Builds a snapshot from a synthetic estimate.
    ///
    /// Unlike provider data, `remaining` is clamped at zero here.
    pub fn estimated(
        estimate: SyntheticEstimate,
        today: NaiveDate,
        login: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let total = DEFAULT_MONTHLY_LIMIT;
        let daily_limit = daily_share(total, today);

        Self {
            total,
            used: estimate.used,
            remaining: signed(total.saturating_sub(estimate.used)),
            daily: estimate.daily,
            daily_limit,
            over_limit: estimate.daily > daily_limit,
            raw_data: RawData::Fallback(FallbackMarker {
                fallback: true,
                user: login.into(),
            }),
            source: UsageSource::Synthetic,
            fetched_at,
        }
    }

    /// Monthly limit.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Monthly consumption.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// `total - used`; negative when over the monthly limit.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Today's usage count.
    pub fn daily(&self) -> u64 {
        self.daily
    }

    /// Even per-day share of the monthly limit.
    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// True when today's usage exceeds the daily share.
    pub fn over_limit(&self) -> bool {
        self.over_limit
    }

    /// The payload this snapshot was derived from.
    pub fn raw_data(&self) -> &RawData {
        &self.raw_data
    }

    /// Which fallback step produced this snapshot.
    pub fn source(&self) -> UsageSource {
        self.source
    }

    /// When the snapshot was taken.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Returns true if the figures are a synthetic estimate.
    pub fn is_estimate(&self) -> bool {
        self.source.is_estimate()
    }

    /// Percentage of the monthly limit consumed (0 when the limit is 0).
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64) * 100.0
    }
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate) -> DateTime<Utc> {
        day.and_time(NaiveTime::MIN).and_utc()
    }

    fn info(limit: Option<u64>, used: Option<u64>) -> UsageInfo {
        UsageInfo {
            total_completions_limit: limit,
            total_completions_used: used,
            ..Default::default()
        }
    }

    #[test]
    fn test_leap_february_scenario() {
        let today = date(2024, 2, 10);
        let mut daily = BTreeMap::new();
        daily.insert("2024-02-10".to_string(), 80);
        let usage = UsageInfo {
            total_completions_limit: Some(3000),
            total_completions_used: Some(450),
            daily_usage: Some(daily),
            ..Default::default()
        };

        let snapshot =
            UsageSnapshot::from_usage_info(usage, UsageSource::Primary, today, 0, at(today));

        assert_eq!(snapshot.total(), 3000);
        assert_eq!(snapshot.used(), 450);
        assert_eq!(snapshot.remaining(), 2550);
        assert_eq!(snapshot.daily(), 80);
        assert_eq!(snapshot.daily_limit(), 103);
        assert!(!snapshot.over_limit());
        assert_eq!(snapshot.source(), UsageSource::Primary);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let today = date(2024, 6, 3);
        let snapshot = UsageSnapshot::from_usage_info(
            UsageInfo::default(),
            UsageSource::Primary,
            today,
            0,
            at(today),
        );

        assert_eq!(snapshot.total(), DEFAULT_MONTHLY_LIMIT);
        assert_eq!(snapshot.used(), 0);
        assert_eq!(snapshot.remaining(), 2000);
        assert_eq!(snapshot.daily(), 0);
        assert_eq!(snapshot.daily_limit(), 66);
    }

    #[test]
    fn test_remaining_goes_negative() {
        let today = date(2024, 6, 3);
        let snapshot = UsageSnapshot::from_usage_info(
            info(Some(100), Some(250)),
            UsageSource::Secondary,
            today,
            0,
            at(today),
        );
        assert_eq!(snapshot.remaining(), -150);
    }

    #[test]
    fn test_remaining_is_exact_difference() {
        let today = date(2024, 1, 15);
        for (limit, used) in [(0, 0), (0, 5), (2000, 1999), (2000, 2000), (7, 1_000_000)] {
            let snapshot = UsageSnapshot::from_usage_info(
                info(Some(limit), Some(used)),
                UsageSource::Primary,
                today,
                0,
                at(today),
            );
            assert_eq!(snapshot.remaining(), limit as i64 - used as i64);
        }
    }

    #[test]
    fn test_daily_falls_back_to_recorded_history() {
        let today = date(2024, 6, 3);
        let mut daily = BTreeMap::new();
        daily.insert("2024-06-02".to_string(), 500);
        let usage = UsageInfo {
            daily_usage: Some(daily),
            ..Default::default()
        };

        let snapshot =
            UsageSnapshot::from_usage_info(usage, UsageSource::Primary, today, 12, at(today));
        assert_eq!(snapshot.daily(), 12);
    }

    #[test]
    fn test_reported_zero_beats_recorded_history() {
        let today = date(2024, 6, 3);
        let mut daily = BTreeMap::new();
        daily.insert("2024-06-03".to_string(), 0);
        let usage = UsageInfo {
            daily_usage: Some(daily),
            ..Default::default()
        };

        let snapshot =
            UsageSnapshot::from_usage_info(usage, UsageSource::Primary, today, 40, at(today));
        assert_eq!(snapshot.daily(), 0);
    }

    #[test]
    fn test_over_limit_is_strict() {
        // June: 2000 / 30 = 66
        let today = date(2024, 6, 3);
        let at_limit =
            UsageSnapshot::from_usage_info(info(None, None), UsageSource::Primary, today, 66, at(today));
        assert!(!at_limit.over_limit());

        let above =
            UsageSnapshot::from_usage_info(info(None, None), UsageSource::Primary, today, 67, at(today));
        assert!(above.over_limit());
    }

    #[test]
    fn test_estimated_snapshot() {
        let today = date(2024, 7, 4);
        let estimate = SyntheticEstimate { used: 320, daily: 70 };
        let snapshot = UsageSnapshot::estimated(estimate, today, "octocat", at(today));

        assert_eq!(snapshot.total(), 2000);
        assert_eq!(snapshot.used(), 320);
        assert_eq!(snapshot.remaining(), 1680);
        assert_eq!(snapshot.daily_limit(), 64);
        assert!(snapshot.over_limit());
        assert!(snapshot.is_estimate());
        assert_eq!(
            snapshot.raw_data(),
            &RawData::Fallback(FallbackMarker {
                fallback: true,
                user: "octocat".to_string()
            })
        );
    }

    #[test]
    fn test_estimated_remaining_clamps_at_zero() {
        let today = date(2024, 7, 31);
        let estimate = SyntheticEstimate { used: 2500, daily: 0 };
        let snapshot = UsageSnapshot::estimated(estimate, today, "octocat", at(today));
        assert_eq!(snapshot.remaining(), 0);
    }

    #[test]
    fn test_percent_used() {
        let today = date(2024, 7, 1);
        let snapshot = UsageSnapshot::from_usage_info(
            info(Some(2000), Some(500)),
            UsageSource::Primary,
            today,
            0,
            at(today),
        );
        assert!((snapshot.percent_used() - 25.0).abs() < f64::EPSILON);

        let zero = UsageSnapshot::from_usage_info(
            info(Some(0), Some(10)),
            UsageSource::Primary,
            today,
            0,
            at(today),
        );
        assert!(zero.percent_used().abs() < f64::EPSILON);
    }
}
