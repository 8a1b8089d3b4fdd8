// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CopilotBar` Fetch
//!
//! Fetch strategies, the fallback pipeline, and the HTTP host client.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//!
//! ## Fetch Pipeline
//!
//! The pipeline executes strategies in priority order until one succeeds or
//! a strategy refuses to fall through:
//!
//! - [`strategy::FetchStrategy`] - Trait for fetch implementations
//! - [`pipeline::FetchPipeline`] - Executes strategies in order
//! - [`context::FetchContext`] - Credential, principal and settings
//!
//! ## Example
//!
//! ```ignore
//! use copilotbar_fetch::{FetchContext, FetchPipeline};
//!
//! let ctx = FetchContext::builder(credential, identity)
//!     .allow_estimate(false)
//!     .build();
//!
//! let pipeline = FetchPipeline::with_strategies(vec![
//!     Box::new(UserMetricsStrategy::new(api.clone())),
//!     Box::new(OrgMetricsStrategy::new(api.clone())),
//! ]);
//!
//! let outcome = pipeline.execute(&ctx).await;
//! ```

pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod strategy;

// Errors
pub use error::{FetchError, HttpError};

// Host APIs
pub use host::http::{HttpClient, ResponseExt};

// Strategy & Pipeline
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
pub use pipeline::{FetchAttempt, FetchOutcome, FetchPipeline};
pub use strategy::{FetchKind, FetchResult, FetchStrategy, UsagePayload};
