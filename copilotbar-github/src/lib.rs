// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CopilotBar` GitHub
//!
//! Acquires GitHub Copilot usage and turns it into snapshots.
//!
//! - [`api`] - REST client for the endpoints the fallback chain needs
//! - [`validator`] - One identity lookup deciding whether a credential works
//! - [`strategies`] - The three steps of the fallback chain
//! - [`estimate`] - Seedable random stand-in when no endpoint answers
//! - [`engine`] - Validation, pipeline, derivation and history recording
//! - [`session`] - Holds the active credential and publishes refreshes
//! - [`check`] - Diagnostic identity and seat lookup
//!
//! ## Usage
//!
//! ```ignore
//! use copilotbar_github::{GitHubClient, UsageEngine};
//!
//! let api = Arc::new(GitHubClient::new(DEFAULT_API_BASE_URL, timeout)?);
//! let engine = UsageEngine::new(api, history, Arc::new(LocalClock));
//! let snapshot = engine.fetch(&credential).await?;
//! println!("{} of {} used", snapshot.used(), snapshot.total());
//! ```

pub mod api;
pub mod check;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod session;
pub mod strategies;
pub mod validator;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{GitHubApi, GitHubClient, Organization, SeatInfo};
pub use check::{CheckReport, SeatStatus, run_check};
pub use engine::{UsageEngine, UsageReport};
pub use error::UsageError;
pub use estimate::SyntheticEstimator;
pub use session::{Session, spawn_refresh_task};
pub use strategies::{EstimateStrategy, OrgMetricsStrategy, UserMetricsStrategy};
pub use validator::{CredentialValidator, Validation};
