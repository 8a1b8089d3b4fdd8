//! Trait definitions for `CopilotBar`.
//!
//! Derivation and history keys depend on "today" in the local time zone, so
//! the clock is injected wherever a date is needed.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};

/// Source of the current date and time.
pub trait Clock: Send + Sync {
    /// Today's date on the local clock.
    fn today(&self) -> NaiveDate;

    /// Current instant, used for snapshot timestamps.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single day. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    date: NaiveDate,
}

impl FixedClock {
    /// Creates a clock that always reports `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn now(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }
}
