//! Domain models for `CopilotBar`.
//!
//! ## Submodules
//!
//! - [`credential`] - Bearer credential and authenticated identity
//! - [`usage`] - Raw provider usage, synthetic estimates, derived snapshots
//! - [`source`] - Which fallback step produced a snapshot

mod credential;
mod source;
mod usage;

// Re-export everything at the models level
pub use credential::{Credential, Identity};
pub use source::UsageSource;
pub use usage::{
    FallbackMarker, RawData, SyntheticEstimate, UsageInfo, UsageSnapshot, DEFAULT_MONTHLY_LIMIT,
};
