//! Active session.
//!
//! Owns the credential in use and wires the engine to the observable
//! [`UsageStore`]. All front ends go through here; nothing is global.

use copilotbar_core::{Credential, UsageSnapshot};
use copilotbar_store::{CredentialSource, CredentialStore, StoreError, UsageStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::engine::UsageEngine;

/// Shortest period accepted by [`spawn_refresh_task`].
const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// The credential in use plus everything a refresh needs.
pub struct Session {
    engine: Arc<UsageEngine>,
    credentials: CredentialStore,
    usage: Arc<UsageStore>,
    credential: RwLock<Option<Credential>>,
}

impl Session {
    /// Creates a session with no active credential.
    pub fn new(engine: Arc<UsageEngine>, credentials: CredentialStore, usage: Arc<UsageStore>) -> Self {
        Self {
            engine,
            credentials,
            usage,
            credential: RwLock::new(None),
        }
    }

    /// Activates the stored (or environment) credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store cannot be read.
    pub async fn restore(&self) -> Result<Option<CredentialSource>, StoreError> {
        let Some((credential, source)) = self.credentials.load().await? else {
            debug!("No credential to restore");
            return Ok(None);
        };
        info!(source = %source, hint = %credential.hint(), "Credential restored");
        *self.credential.write().await = Some(credential);
        Ok(Some(source))
    }

    /// Persists `credential` and makes it the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be saved.
    pub async fn connect(&self, credential: Credential) -> Result<(), StoreError> {
        self.credentials.save(&credential).await?;
        self.activate(credential).await;
        Ok(())
    }

    /// Makes `credential` the active one without persisting it.
    pub async fn activate(&self, credential: Credential) {
        debug!(hint = %credential.hint(), "Credential activated");
        *self.credential.write().await = Some(credential);
    }

    /// Returns true if a credential is active.
    pub async fn is_configured(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// The observable state this session publishes to.
    pub fn usage_store(&self) -> &Arc<UsageStore> {
        &self.usage
    }

    /// The engine refreshes run on.
    pub fn engine(&self) -> &Arc<UsageEngine> {
        &self.engine
    }

    /// Runs one refresh and publishes the outcome.
    ///
    /// Returns `None` when no credential is active, when another refresh is
    /// already running, or when the refresh failed. The reason is available
    /// from the [`UsageStore`]. A refresh whose credential is cleared or
    /// replaced before it completes neither records history nor publishes.
    #[instrument(skip(self))]
    pub async fn fetch_usage(&self) -> Option<UsageSnapshot> {
        let Some(credential) = self.credential.read().await.clone() else {
            debug!("No credential configured");
            self.usage.set_not_configured().await;
            return None;
        };

        if let Err(e) = self.usage.start_refresh().await {
            debug!(error = %e, "Skipping refresh");
            return None;
        }

        let result = self.engine.observe(&credential).await;

        // The credential may have been cleared or replaced while fetching.
        // Nothing from this refresh is recorded or published then.
        if self.credential.read().await.as_ref() != Some(&credential) {
            debug!("Credential changed during refresh, discarding result");
            self.usage.end_refresh().await;
            return None;
        }

        let result = match result {
            Ok(report) => self.engine.record(&report).await.map(|()| report),
            Err(e) => Err(e),
        };

        let snapshot = match result {
            Ok(report) => {
                self.usage
                    .set_snapshot(report.snapshot.clone(), report.identity)
                    .await;
                Some(report.snapshot)
            }
            Err(e) => {
                error!(error = %e, "Usage refresh failed");
                self.usage.set_disconnected(e.to_string()).await;
                None
            }
        };

        self.usage.end_refresh().await;
        snapshot
    }

    /// Drops the active credential, deletes the stored token and resets the
    /// published state. Makes no network call.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token cannot be deleted; the session
    /// is still cleared.
    #[instrument(skip(self))]
    pub async fn clear_credential(&self) -> Result<(), StoreError> {
        self.credential.write().await.take();
        let cleared = self.credentials.clear().await;
        self.usage.set_not_configured().await;
        info!("Credential cleared");
        cleared.map(|_| ())
    }
}

/// Refreshes immediately, then every `period`, until the handle is aborted.
///
/// Each tick runs on its own task; a tick that lands while a refresh is
/// still running is dropped by the refresh guard.
pub fn spawn_refresh_task(session: Arc<Session>, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_REFRESH_PERIOD);
    info!(seconds = period.as_secs(), "Starting background refresh task");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let session = session.clone();
            tokio::spawn(async move {
                session.fetch_usage().await;
            });
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::SyntheticEstimator;
    use crate::mock::{MockApi, Reply, credential};
    use chrono::NaiveDate;
    use copilotbar_core::{FixedClock, UsageInfo};
    use copilotbar_store::{ConnectionState, HistoryStore, KeyValueStore, MemoryStore, keys};

    struct Fixture {
        api: Arc<MockApi>,
        kv: Arc<MemoryStore>,
        session: Arc<Session>,
    }

    fn fixture(api: MockApi) -> Fixture {
        let api = Arc::new(api);
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()));
        let engine = UsageEngine::new(api.clone(), Arc::new(HistoryStore::new(kv.clone())), clock)
            .with_estimator(Arc::new(SyntheticEstimator::seeded(3)));
        let credentials = CredentialStore::new(kv.clone()).with_env_lookup(|_| None);
        let session = Session::new(Arc::new(engine), credentials, Arc::new(UsageStore::new()));
        Fixture {
            api,
            kv,
            session: Arc::new(session),
        }
    }

    fn usage() -> UsageInfo {
        UsageInfo {
            total_completions_used: Some(100),
            ..UsageInfo::default()
        }
    }

    #[tokio::test]
    async fn test_not_configured() {
        let f = fixture(MockApi::new());

        assert!(f.session.fetch_usage().await.is_none());
        assert_eq!(
            f.session.usage_store().connection().await,
            ConnectionState::NotConfigured
        );
        assert_eq!(f.api.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_and_fetch() {
        let f = fixture(MockApi::new().usage(Reply::Ok(usage())));
        f.session.connect(credential()).await.unwrap();

        let snapshot = f.session.fetch_usage().await.unwrap();

        assert_eq!(snapshot.used(), 100);
        let store = f.session.usage_store();
        assert_eq!(store.connection().await, ConnectionState::Connected);
        assert_eq!(store.snapshot().await, Some(snapshot));
        assert!(!store.is_refreshing().await);
        assert!(f.kv.get(keys::GITHUB_TOKEN).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failure_marks_disconnected() {
        let f = fixture(MockApi::new().user(vec![Reply::Status(401)]));
        f.session.activate(credential()).await;

        assert!(f.session.fetch_usage().await.is_none());

        let store = f.session.usage_store();
        assert_eq!(store.connection().await, ConnectionState::Disconnected);
        assert!(store.error().await.unwrap().contains("invalid or expired"));
        assert!(!store.is_refreshing().await);
    }

    #[tokio::test]
    async fn test_in_flight_guard_skips() {
        let f = fixture(MockApi::new().usage(Reply::Ok(usage())));
        f.session.activate(credential()).await;
        f.session.usage_store().start_refresh().await.unwrap();

        assert!(f.session.fetch_usage().await.is_none());
        assert_eq!(f.api.network_calls(), 0);
        assert!(f.session.usage_store().is_refreshing().await);
    }

    #[tokio::test]
    async fn test_clear_credential() {
        let f = fixture(MockApi::new().usage(Reply::Ok(usage())));
        f.session.connect(credential()).await.unwrap();
        f.session.fetch_usage().await.unwrap();
        let calls = f.api.network_calls();

        f.session.clear_credential().await.unwrap();

        assert!(!f.session.is_configured().await);
        assert!(f.kv.get(keys::GITHUB_TOKEN).await.unwrap().is_none());
        let store = f.session.usage_store();
        assert_eq!(store.connection().await, ConnectionState::NotConfigured);
        assert!(store.snapshot().await.is_none());
        assert_eq!(f.api.network_calls(), calls);
        assert!(f.session.fetch_usage().await.is_none());
    }

    #[tokio::test]
    async fn test_replaced_credential_discards_refresh() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let f = fixture(MockApi::new().usage(Reply::Ok(usage())).gate_usage(gate.clone()));
        f.session.activate(credential()).await;

        let session = f.session.clone();
        let refresh = tokio::spawn(async move { session.fetch_usage().await });
        while f.api.usage_calls() == 0 {
            tokio::task::yield_now().await;
        }
        f.session
            .activate(Credential::new("ghp_replacement0002").unwrap())
            .await;
        gate.notify_one();

        assert!(refresh.await.unwrap().is_none());
        let store = f.session.usage_store();
        assert!(store.snapshot().await.is_none());
        assert!(!store.is_refreshing().await);
        assert!(f.kv.get(keys::USAGE_HISTORY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore() {
        let f = fixture(MockApi::new());
        assert_eq!(f.session.restore().await.unwrap(), None);

        f.kv.set(keys::GITHUB_TOKEN, serde_json::json!("ghp_restored"))
            .await
            .unwrap();
        assert_eq!(
            f.session.restore().await.unwrap(),
            Some(CredentialSource::Stored)
        );
        assert!(f.session.is_configured().await);
    }

    #[tokio::test]
    async fn test_refresh_task_ticks_immediately() {
        let f = fixture(MockApi::new().usage(Reply::Ok(usage())));
        f.session.activate(credential()).await;
        let mut rx = f.session.usage_store().subscribe();

        let handle = spawn_refresh_task(f.session.clone(), Duration::from_secs(60));
        tokio::time::timeout(Duration::from_secs(5), async {
            while f.session.usage_store().snapshot().await.is_none() {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        handle.abort();

        assert_eq!(f.api.usage_calls(), 1);
    }
}
