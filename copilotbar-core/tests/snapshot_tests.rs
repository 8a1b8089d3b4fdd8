//! Integration tests for snapshot derivation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use copilotbar_core::calendar::{daily_share, date_key};
use copilotbar_core::{Clock, FixedClock, UsageInfo, UsageSnapshot, UsageSource};

fn clock(y: i32, m: u32, d: u32) -> FixedClock {
    FixedClock::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[test]
fn test_end_to_end_leap_february() {
    let clock = clock(2024, 2, 10);
    let info: UsageInfo = serde_json::from_str(
        r#"{"total_completions_limit":3000,"total_completions_used":450,"daily_usage":{"2024-02-10":80}}"#,
    )
    .unwrap();

    let snapshot = UsageSnapshot::from_usage_info(
        info,
        UsageSource::Primary,
        clock.today(),
        0,
        clock.now(),
    );

    assert_eq!(snapshot.total(), 3000);
    assert_eq!(snapshot.used(), 450);
    assert_eq!(snapshot.remaining(), 2550);
    assert_eq!(snapshot.daily(), 80);
    assert_eq!(snapshot.daily_limit(), 103);
    assert!(!snapshot.over_limit());
}

#[test]
fn test_derived_fields_are_consistent() {
    let days = [
        clock(2023, 2, 28),
        clock(2024, 2, 29),
        clock(2024, 4, 1),
        clock(2024, 12, 31),
    ];

    for clock in days {
        let today = clock.today();
        for (limit, used, daily) in [(2000, 0, 0), (3000, 3100, 200), (1, 1, 1), (0, 0, 0)] {
            let mut map = BTreeMap::new();
            map.insert(date_key(today), daily);
            let info = UsageInfo {
                total_completions_limit: Some(limit),
                total_completions_used: Some(used),
                daily_usage: Some(map),
                ..Default::default()
            };

            let snapshot = UsageSnapshot::from_usage_info(
                info,
                UsageSource::Secondary,
                today,
                0,
                clock.now(),
            );

            assert_eq!(snapshot.remaining(), limit as i64 - used as i64);
            assert_eq!(snapshot.daily_limit(), daily_share(limit, today));
            assert_eq!(
                snapshot.over_limit(),
                snapshot.daily() > snapshot.daily_limit()
            );
        }
    }
}
