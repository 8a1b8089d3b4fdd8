//! Synthetic usage estimate.
//!
//! When neither metering endpoint answers, a rough monthly figure is made up
//! so the front end still has something to show: a random base plus 30
//! completions per elapsed day, and a random count for today. Snapshots
//! built from it are tagged as estimates.

use chrono::{Datelike, NaiveDate};
use copilotbar_core::SyntheticEstimate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Upper bound (exclusive) of the random monthly base.
pub const USED_JITTER: u64 = 500;

/// Completions assumed per day of the month.
pub const PER_DAY_OF_MONTH: u64 = 30;

/// Upper bound (exclusive) of the random daily count.
pub const DAILY_JITTER: u64 = 100;

/// Seedable source of [`SyntheticEstimate`]s.
pub struct SyntheticEstimator {
    rng: Mutex<StdRng>,
}

impl SyntheticEstimator {
    /// Estimator with a fixed seed; the same seed gives the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Estimator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Draws an estimate for `today`.
    pub fn estimate(&self, today: NaiveDate) -> SyntheticEstimate {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let used = rng.gen_range(0..USED_JITTER) + PER_DAY_OF_MONTH * u64::from(today.day());
        let daily = rng.gen_range(0..DAILY_JITTER);
        SyntheticEstimate { used, daily }
    }
}

impl Default for SyntheticEstimator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for SyntheticEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticEstimator").finish_non_exhaustive()
    }
}
