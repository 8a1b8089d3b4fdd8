//! Usage acquisition engine.
//!
//! One refresh: validate the credential, run the fallback chain, derive the
//! snapshot, record today's daily value. Publishing the result is left to
//! the caller (see [`Session`](crate::Session)), which may also defer the
//! recording step through [`UsageEngine::observe`] and [`UsageEngine::record`].

use copilotbar_core::calendar::date_key;
use chrono::NaiveDate;
use copilotbar_core::{Clock, Credential, Identity, UsageSnapshot};
use copilotbar_fetch::{
    FetchAttempt, FetchContext, FetchError, FetchOutcome, FetchPipeline, FetchSettings,
    UsagePayload,
};
use copilotbar_store::HistoryStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::GitHubApi;
use crate::error::UsageError;
use crate::estimate::SyntheticEstimator;
use crate::strategies::{EstimateStrategy, OrgMetricsStrategy, UserMetricsStrategy};
use crate::validator::{CredentialValidator, INVALID_CREDENTIAL_REASON, Validation};

/// A snapshot together with how it was obtained.
#[derive(Debug, Clone)]
pub struct UsageReport {
    /// The derived snapshot.
    pub snapshot: UsageSnapshot,
    /// The principal the credential authenticated as.
    pub identity: Identity,
    /// Every strategy attempt, in order.
    pub attempts: Vec<FetchAttempt>,
    /// The local day the snapshot describes.
    pub day: NaiveDate,
}

/// Runs refreshes against one API, history and clock.
pub struct UsageEngine {
    api: Arc<dyn GitHubApi>,
    validator: CredentialValidator,
    pipeline: FetchPipeline,
    history: Arc<HistoryStore>,
    clock: Arc<dyn Clock>,
    settings: FetchSettings,
}

impl UsageEngine {
    /// Creates an engine with an entropy-seeded estimator and default fetch
    /// settings.
    pub fn new(api: Arc<dyn GitHubApi>, history: Arc<HistoryStore>, clock: Arc<dyn Clock>) -> Self {
        let pipeline = build_pipeline(
            &api,
            Arc::new(SyntheticEstimator::from_entropy()),
            &clock,
        );
        Self {
            validator: CredentialValidator::new(api.clone()),
            api,
            pipeline,
            history,
            clock,
            settings: FetchSettings::default(),
        }
    }

    /// Replaces the estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<SyntheticEstimator>) -> Self {
        self.pipeline = build_pipeline(&self.api, estimator, &self.clock);
        self
    }

    /// Replaces the fetch settings.
    #[must_use]
    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The history this engine records into.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Fetches one snapshot.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when the credential is rejected at any point,
    /// `Transient` for any other fetch failure, `Store` when the history
    /// cannot be read or written.
    pub async fn fetch(&self, credential: &Credential) -> Result<UsageSnapshot, UsageError> {
        Ok(self.fetch_report(credential).await?.snapshot)
    }

    /// Like [`fetch`](Self::fetch), also returning the principal and the
    /// strategy attempts.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_report(&self, credential: &Credential) -> Result<UsageReport, UsageError> {
        let report = self.observe(credential).await?;
        self.record(&report).await?;
        Ok(report)
    }

    /// Validates, runs the fallback chain and derives the snapshot without
    /// writing anything. History is only read.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    #[instrument(skip_all)]
    pub async fn observe(&self, credential: &Credential) -> Result<UsageReport, UsageError> {
        let identity = match self.validator.validate(credential).await {
            Validation::Valid { identity } => identity,
            Validation::Invalid { reason } => {
                return Err(UsageError::AuthenticationFailed(reason));
            }
        };

        let ctx = FetchContext::builder(credential.clone(), identity.clone())
            .settings(self.settings.clone())
            .build();
        let FetchOutcome {
            result, attempts, ..
        } = self.pipeline.execute(&ctx).await;

        let result = result.map_err(|e| match e {
            FetchError::AuthenticationFailed(_) => {
                UsageError::AuthenticationFailed(INVALID_CREDENTIAL_REASON.to_string())
            }
            other => UsageError::Transient(other),
        })?;

        let today = self.clock.today();
        let now = self.clock.now();
        let source = result.source();

        let snapshot = match result.payload {
            UsagePayload::Reported(info) => {
                let recorded = if info.daily_for(&date_key(today)).is_some() {
                    0
                } else {
                    debug!("Provider did not report today, using history");
                    self.history.read_daily(today).await?
                };
                UsageSnapshot::from_usage_info(info, source, today, recorded, now)
            }
            UsagePayload::Estimated { estimate, login } => {
                UsageSnapshot::estimated(estimate, today, login, now)
            }
        };

        Ok(UsageReport {
            snapshot,
            identity,
            attempts,
            day: today,
        })
    }

    /// Records the report's daily value into the history.
    ///
    /// # Errors
    ///
    /// `Store` when the history cannot be written.
    pub async fn record(&self, report: &UsageReport) -> Result<(), UsageError> {
        let snapshot = &report.snapshot;
        self.history.record_daily(report.day, snapshot.daily()).await?;

        if snapshot.is_estimate() {
            warn!(
                used = snapshot.used(),
                total = snapshot.total(),
                "Usage figures are an estimate"
            );
        } else {
            info!(
                source = %snapshot.source(),
                used = snapshot.used(),
                total = snapshot.total(),
                daily = snapshot.daily(),
                "Usage fetched"
            );
        }
        Ok(())
    }
}

fn build_pipeline(
    api: &Arc<dyn GitHubApi>,
    estimator: Arc<SyntheticEstimator>,
    clock: &Arc<dyn Clock>,
) -> FetchPipeline {
    FetchPipeline::with_strategies(vec![
        Box::new(UserMetricsStrategy::new(api.clone())),
        Box::new(OrgMetricsStrategy::new(api.clone())),
        Box::new(EstimateStrategy::new(api.clone(), estimator, clock.clone())),
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, Reply, credential, org};
    use chrono::NaiveDate;
    use copilotbar_core::{FixedClock, RawData, UsageInfo, UsageSource};
    use copilotbar_store::MemoryStore;
    use std::collections::BTreeMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
    }

    fn engine(api: Arc<MockApi>) -> (UsageEngine, Arc<HistoryStore>) {
        let history = Arc::new(HistoryStore::new(Arc::new(MemoryStore::new())));
        let engine = UsageEngine::new(api, history.clone(), Arc::new(FixedClock::new(today())))
            .with_estimator(Arc::new(SyntheticEstimator::seeded(99)));
        (engine, history)
    }

    fn reported(limit: Option<u64>, used: Option<u64>, daily: &[(&str, u64)]) -> UsageInfo {
        UsageInfo {
            total_completions_limit: limit,
            total_completions_used: used,
            daily_usage: (!daily.is_empty()).then(|| {
                daily
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), *v))
                    .collect::<BTreeMap<_, _>>()
            }),
            ..UsageInfo::default()
        }
    }

    #[tokio::test]
    async fn test_primary_scenario() {
        let info = reported(Some(3000), Some(450), &[("2024-02-10", 80)]);
        let api = Arc::new(MockApi::new().usage(Reply::Ok(info.clone())));
        let (engine, history) = engine(api.clone());

        let snapshot = engine.fetch(&credential()).await.unwrap();

        assert_eq!(snapshot.total(), 3000);
        assert_eq!(snapshot.used(), 450);
        assert_eq!(snapshot.remaining(), 2550);
        assert_eq!(snapshot.daily(), 80);
        assert_eq!(snapshot.daily_limit(), 103);
        assert!(!snapshot.over_limit());
        assert_eq!(snapshot.source(), UsageSource::Primary);
        assert_eq!(snapshot.raw_data(), &RawData::Provider(info));
        assert_eq!(history.read_daily(today()).await.unwrap(), 80);
        assert_eq!(api.orgs_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_daily_uses_history() {
        let api = Arc::new(MockApi::new().usage(Reply::Ok(reported(None, Some(10), &[]))));
        let (engine, history) = engine(api);
        history.record_daily(today(), 33).await.unwrap();

        let snapshot = engine.fetch(&credential()).await.unwrap();

        assert_eq!(snapshot.total(), 2000);
        assert_eq!(snapshot.daily(), 33);
        assert_eq!(snapshot.daily_limit(), 68);
        assert_eq!(history.read_daily(today()).await.unwrap(), 33);
    }

    #[tokio::test]
    async fn test_reported_zero_overrides_history() {
        let api = Arc::new(
            MockApi::new().usage(Reply::Ok(reported(None, None, &[("2024-02-10", 0)]))),
        );
        let (engine, history) = engine(api);
        history.record_daily(today(), 33).await.unwrap();

        let snapshot = engine.fetch(&credential()).await.unwrap();

        assert_eq!(snapshot.daily(), 0);
        assert_eq!(history.read_daily(today()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_credential_short_circuits() {
        let api = Arc::new(MockApi::new().user(vec![Reply::Status(401)]));
        let (engine, history) = engine(api.clone());

        let err = engine.fetch(&credential()).await.unwrap_err();

        assert!(matches!(
            err,
            UsageError::AuthenticationFailed(ref reason) if reason == INVALID_CREDENTIAL_REASON
        ));
        assert_eq!(api.user_calls(), 1);
        assert_eq!(api.usage_calls(), 0);
        assert_eq!(api.orgs_calls(), 0);
        assert_eq!(api.org_usage_calls(), 0);
        assert!(history.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_writes_nothing_until_recorded() {
        let api = Arc::new(MockApi::new().usage(Reply::Ok(UsageInfo {
            daily_usage: Some(BTreeMap::from([("2024-02-10".to_string(), 12)])),
            ..UsageInfo::default()
        })));
        let (engine, history) = engine(api);

        let report = engine.observe(&credential()).await.unwrap();
        assert_eq!(report.day, today());
        assert!(history.entries().await.unwrap().is_empty());

        engine.record(&report).await.unwrap();
        assert_eq!(history.read_daily(today()).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_primary_server_error_is_transient() {
        let api = Arc::new(MockApi::new().usage(Reply::Status(500)));
        let (engine, history) = engine(api.clone());

        let err = engine.fetch(&credential()).await.unwrap_err();

        assert!(matches!(
            err,
            UsageError::Transient(FetchError::UnexpectedStatus { status: 500, .. })
        ));
        assert_eq!(api.orgs_calls(), 0);
        assert!(history.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let api = Arc::new(MockApi::new().usage(Reply::Status(429)));
        let (engine, _) = engine(api.clone());

        let err = engine.fetch(&credential()).await.unwrap_err();
        assert!(matches!(
            err,
            UsageError::Transient(FetchError::RateLimited { .. })
        ));
        assert_eq!(api.orgs_calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_mid_chain() {
        let api = Arc::new(MockApi::new().usage(Reply::Status(401)));
        let (engine, _) = engine(api);

        let err = engine.fetch(&credential()).await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_org_success_is_secondary() {
        let api = Arc::new(
            MockApi::new()
                .orgs(Reply::Ok(vec![org("acme")]))
                .org_usage(Reply::Ok(reported(Some(1000), Some(120), &[("2024-02-10", 9)]))),
        );
        let (engine, history) = engine(api);

        let report = engine.fetch_report(&credential()).await.unwrap();

        assert_eq!(report.snapshot.source(), UsageSource::Secondary);
        assert_eq!(report.snapshot.remaining(), 880);
        assert_eq!(report.identity.login, "octocat");
        assert_eq!(report.attempts.len(), 2);
        assert!(!report.attempts[0].success);
        assert!(report.attempts[1].success);
        assert_eq!(history.read_daily(today()).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_synthetic_when_nothing_answers() {
        let api = Arc::new(MockApi::new());
        let (engine, history) = engine(api.clone());

        let snapshot = engine.fetch(&credential()).await.unwrap();

        assert_eq!(snapshot.source(), UsageSource::Synthetic);
        assert_eq!(snapshot.total(), 2000);
        assert!(snapshot.used() >= 300 && snapshot.used() < 800);
        assert!(snapshot.daily() < 100);
        assert_eq!(snapshot.daily_limit(), 68);
        assert_eq!(snapshot.over_limit(), snapshot.daily() > 68);
        match snapshot.raw_data() {
            RawData::Fallback(marker) => {
                assert!(marker.fallback);
                assert_eq!(marker.user, "octocat");
            }
            RawData::Provider(_) => panic!("expected fallback marker"),
        }
        assert_eq!(
            history.read_daily(today()).await.unwrap(),
            snapshot.daily()
        );
        // Validation plus the estimate's own identity lookup.
        assert_eq!(api.user_calls(), 2);
    }

    #[tokio::test]
    async fn test_synthetic_identity_failure_fails_fetch() {
        let api = Arc::new(
            MockApi::new().user(vec![Reply::Ok(Identity::new("octocat")), Reply::Status(503)]),
        );
        let (engine, history) = engine(api);

        let err = engine.fetch(&credential()).await.unwrap_err();

        assert!(matches!(err, UsageError::Transient(_)));
        assert!(history.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_estimates_repeat() {
        let first = engine(Arc::new(MockApi::new()))
            .0
            .fetch(&credential())
            .await
            .unwrap();
        let second = engine(Arc::new(MockApi::new()))
            .0
            .fetch(&credential())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_estimate_disabled_surfaces_last_error() {
        let api = Arc::new(MockApi::new());
        let (engine, _) = engine(api);
        let engine = engine.with_settings(FetchSettings {
            allow_estimate: false,
            ..FetchSettings::default()
        });

        let err = engine.fetch(&credential()).await.unwrap_err();
        assert!(matches!(err, UsageError::Transient(FetchError::NoOrganizations)));
    }
}
