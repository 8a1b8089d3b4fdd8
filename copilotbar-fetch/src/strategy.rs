//! Fetch strategy trait and types.
//!
//! A strategy represents one step of the usage fallback chain. Strategies
//! are tried in priority order; each one decides whether its failure may
//! fall through to the next.

use async_trait::async_trait;
use copilotbar_core::{SyntheticEstimate, UsageInfo, UsageSource};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::FetchContext;
use crate::error::FetchError;

// ============================================================================
// Fetch Kind
// ============================================================================

/// The kind of data source a strategy reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Per-user metering endpoint.
    UserMetrics,
    /// Organization metering endpoint.
    OrgMetrics,
    /// Randomized estimate.
    Estimate,
}

impl FetchKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::UserMetrics => "User Metrics",
            Self::OrgMetrics => "Organization Metrics",
            Self::Estimate => "Estimate",
        }
    }

    /// Convert to the source tag recorded on snapshots.
    pub fn to_usage_source(&self) -> UsageSource {
        match self {
            Self::UserMetrics => UsageSource::Primary,
            Self::OrgMetrics => UsageSource::Secondary,
            Self::Estimate => UsageSource::Synthetic,
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Fetch Result
// ============================================================================

/// What a strategy produced.
#[derive(Debug, Clone, PartialEq)]
pub enum UsagePayload {
    /// Figures reported by the provider.
    Reported(UsageInfo),
    /// Figures made up locally.
    Estimated {
        /// The randomized figures.
        estimate: SyntheticEstimate,
        /// Login of the principal, as re-read by the estimating strategy.
        login: String,
    },
}

/// The result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The fetched payload.
    pub payload: UsagePayload,
    /// The strategy that succeeded.
    pub strategy_id: String,
    /// The kind of fetch used.
    pub kind: FetchKind,
}

impl FetchResult {
    /// Creates a new fetch result.
    pub fn new(payload: UsagePayload, strategy_id: impl Into<String>, kind: FetchKind) -> Self {
        Self {
            payload,
            strategy_id: strategy_id.into(),
            kind,
        }
    }

    /// Returns the snapshot source tag for this result.
    pub fn source(&self) -> UsageSource {
        self.kind.to_usage_source()
    }
}

// ============================================================================
// Fetch Strategy Trait
// ============================================================================

/// One step of the usage fallback chain.
///
/// ## Implementing a Strategy
///
/// ```ignore
/// struct UserMetricsStrategy { api: Arc<dyn GitHubApi> }
///
/// #[async_trait]
/// impl FetchStrategy for UserMetricsStrategy {
///     fn id(&self) -> &str {
///         "copilot.user"
///     }
///
///     fn kind(&self) -> FetchKind {
///         FetchKind::UserMetrics
///     }
///
///     async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
///         let info = self.api.user_usage(ctx.credential()).await?;
///         Ok(FetchResult::new(UsagePayload::Reported(info), self.id(), self.kind()))
///     }
/// }
/// ```
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Unique identifier for this strategy (e.g., "copilot.user").
    ///
    /// Format: `{provider}.{source}`
    fn id(&self) -> &str;

    /// The kind of data source this strategy uses.
    fn kind(&self) -> FetchKind;

    /// Check if this strategy can run at all. Must not hit the network.
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        true
    }

    /// Fetch usage data using this strategy.
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError>;

    /// Whether to try the next strategy if this one fails with the given error.
    fn should_fallback(&self, error: &FetchError) -> bool {
        match error {
            // Don't fallback on rate limiting - wait for the next tick
            FetchError::RateLimited { .. } => false,
            // Don't fallback on auth errors - the credential is bad
            FetchError::AuthenticationFailed(_) => false,
            _ => true,
        }
    }

    /// Priority of this strategy (higher = try first).
    ///
    /// Default priorities:
    /// - User metrics: 100
    /// - Organization metrics: 80
    /// - Estimate: 10
    fn priority(&self) -> u32 {
        match self.kind() {
            FetchKind::UserMetrics => 100,
            FetchKind::OrgMetrics => 80,
            FetchKind::Estimate => 10,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
