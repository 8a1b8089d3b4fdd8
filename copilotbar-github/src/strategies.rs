//! The fallback chain.
//!
//! | Strategy | Kind | Priority | Falls through on |
//! |----------|------|----------|------------------|
//! | `copilot.user` | User metrics | 100 | 404 / 403 only |
//! | `copilot.org` | Org metrics | 80 | anything but a rejected credential |
//! | `copilot.estimate` | Estimate | 10 | (last) |

use async_trait::async_trait;
use copilotbar_core::Clock;
use copilotbar_fetch::{
    FetchContext, FetchError, FetchKind, FetchResult, FetchStrategy, UsagePayload,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::api::GitHubApi;
use crate::estimate::SyntheticEstimator;

// ============================================================================
// User Metrics
// ============================================================================

/// Per-user Copilot usage (`GET /copilot/usage`).
pub struct UserMetricsStrategy {
    api: Arc<dyn GitHubApi>,
}

impl UserMetricsStrategy {
    /// Creates the strategy.
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FetchStrategy for UserMetricsStrategy {
    fn id(&self) -> &str {
        "copilot.user"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::UserMetrics
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        debug!("Fetching per-user Copilot usage");
        let info = self.api.user_usage(ctx.credential()).await?;
        Ok(FetchResult::new(
            UsagePayload::Reported(info),
            self.id(),
            self.kind(),
        ))
    }

    fn should_fallback(&self, error: &FetchError) -> bool {
        error.is_endpoint_unavailable()
    }
}

// ============================================================================
// Organization Metrics
// ============================================================================

/// Usage of the principal's first organization
/// (`GET /user/orgs`, then `GET /orgs/{org}/copilot/usage`).
pub struct OrgMetricsStrategy {
    api: Arc<dyn GitHubApi>,
}

impl OrgMetricsStrategy {
    /// Creates the strategy.
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FetchStrategy for OrgMetricsStrategy {
    fn id(&self) -> &str {
        "copilot.org"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::OrgMetrics
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        let orgs = self.api.organizations(ctx.credential()).await?;
        let Some(org) = orgs.first() else {
            debug!("Principal belongs to no organization");
            return Err(FetchError::NoOrganizations);
        };

        debug!(org = %org.login, count = orgs.len(), "Fetching organization usage");
        let info = self
            .api
            .organization_usage(ctx.credential(), &org.login)
            .await?;
        Ok(FetchResult::new(
            UsagePayload::Reported(info),
            self.id(),
            self.kind(),
        ))
    }

    fn should_fallback(&self, error: &FetchError) -> bool {
        !error.is_auth_failure()
    }
}

// ============================================================================
// Estimate
// ============================================================================

/// Randomized stand-in. Re-reads the principal so the marker names the
/// account the estimate is for.
pub struct EstimateStrategy {
    api: Arc<dyn GitHubApi>,
    estimator: Arc<SyntheticEstimator>,
    clock: Arc<dyn Clock>,
}

impl EstimateStrategy {
    /// Creates the strategy.
    pub fn new(
        api: Arc<dyn GitHubApi>,
        estimator: Arc<SyntheticEstimator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            estimator,
            clock,
        }
    }
}

#[async_trait]
impl FetchStrategy for EstimateStrategy {
    fn id(&self) -> &str {
        "copilot.estimate"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::Estimate
    }

    async fn is_available(&self, ctx: &FetchContext) -> bool {
        ctx.settings.allow_estimate
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        let identity = self.api.authenticated_user(ctx.credential()).await?;
        let estimate = self.estimator.estimate(self.clock.today());
        warn!(login = %identity.login, "No metering endpoint answered, estimating usage");

        Ok(FetchResult::new(
            UsagePayload::Estimated {
                estimate,
                login: identity.login,
            },
            self.id(),
            self.kind(),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
