// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CopilotBar` Core
//!
//! Core types, models, and traits for the `CopilotBar` application.
//!
//! This crate provides the foundational abstractions used across all other
//! `CopilotBar` crates, including:
//!
//! - Domain models (credentials, identities, raw usage, derived snapshots)
//! - Metric derivation (remaining, daily limit, over-limit)
//! - Calendar helpers (history date keys, month lengths)
//! - Error types
//!
//! ## Key Types
//!
//! ### Inputs
//! - [`Credential`] - Opaque bearer token, redacted in all formatting
//! - [`UsageInfo`] - Schema-optional provider response
//! - [`SyntheticEstimate`] - Randomized stand-in when no endpoint answers
//!
//! ### Outputs
//! - [`UsageSnapshot`] - Fully derived, immutable usage summary
//! - [`RawData`] - Diagnostic payload a snapshot was derived from
//! - [`UsageSource`] - Which step of the fallback chain produced the data
//! - [`Identity`] - Authenticated principal

pub mod calendar;
pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Inputs
    Credential,
    Identity,
    SyntheticEstimate,
    UsageInfo,
    // Outputs
    FallbackMarker,
    RawData,
    UsageSnapshot,
    UsageSource,
    // Constants
    DEFAULT_MONTHLY_LIMIT,
};

// Re-export traits
pub use traits::{Clock, FixedClock, LocalClock};
