//! Where a snapshot came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fallback-chain step that produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    /// Per-user usage metrics.
    #[default]
    Primary,
    /// Usage metrics of the first organization the user belongs to.
    Secondary,
    /// Randomized estimate; no metering endpoint answered.
    Synthetic,
}

impl UsageSource {
    /// Returns the display name for this source.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Primary => "user metrics",
            Self::Secondary => "organization metrics",
            Self::Synthetic => "estimate",
        }
    }

    /// Returns true if the numbers are not measured.
    pub fn is_estimate(&self) -> bool {
        matches!(self, Self::Synthetic)
    }
}

impl fmt::Display for UsageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
