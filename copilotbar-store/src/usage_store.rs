//! Observable usage state.
//!
//! Holds what the front end shows: the latest snapshot, whether the
//! credential is connected, the last error, and whether a refresh is
//! running. Every mutation bumps a version on a watch channel.

use chrono::{DateTime, Utc};
use copilotbar_core::{Identity, UsageSnapshot};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Connection State
// ============================================================================

/// Whether the front end should show the account as connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No credential is configured.
    #[default]
    NotConfigured,
    /// The last refresh produced a snapshot.
    Connected,
    /// The last refresh failed.
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotConfigured => "not configured",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        })
    }
}

// ============================================================================
// Inner State
// ============================================================================

#[derive(Default)]
struct UsageStoreInner {
    snapshot: Option<UsageSnapshot>,
    identity: Option<Identity>,
    connection: ConnectionState,
    error: Option<String>,
    refresh_in_progress: bool,
    last_refresh: Option<DateTime<Utc>>,
    snapshot_time: Option<DateTime<Utc>>,
}

// ============================================================================
// Usage Store
// ============================================================================

/// State store for the latest usage data.
///
/// Observable via watch channels for UI updates.
pub struct UsageStore {
    inner: Arc<RwLock<UsageStoreInner>>,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl Default for UsageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageStore {
    /// Creates an empty store in the "not configured" state.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(UsageStoreInner::default())),
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    // ========================================================================
    // Snapshot Access
    // ========================================================================

    /// Gets the latest snapshot.
    pub async fn snapshot(&self) -> Option<UsageSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    /// Gets the principal of the latest successful refresh.
    pub async fn identity(&self) -> Option<Identity> {
        self.inner.read().await.identity.clone()
    }

    /// Publishes a successful refresh. Clears any previous error.
    pub async fn set_snapshot(&self, snapshot: UsageSnapshot, identity: Identity) {
        {
            let mut inner = self.inner.write().await;
            inner.snapshot_time = Some(snapshot.fetched_at());
            inner.snapshot = Some(snapshot);
            inner.identity = Some(identity);
            inner.connection = ConnectionState::Connected;
            inner.error = None;
        }
        self.notify_change().await;
        debug!("Snapshot updated");
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Gets the connection state.
    pub async fn connection(&self) -> ConnectionState {
        self.inner.read().await.connection
    }

    /// Publishes a failed refresh. The previous snapshot is kept for display.
    pub async fn set_disconnected(&self, error: String) {
        {
            let mut inner = self.inner.write().await;
            inner.connection = ConnectionState::Disconnected;
            inner.error = Some(error);
        }
        self.notify_change().await;
        warn!("Usage source disconnected");
    }

    /// Drops all state; used when the credential is cleared.
    pub async fn set_not_configured(&self) {
        {
            let mut inner = self.inner.write().await;
            let refreshing = inner.refresh_in_progress;
            *inner = UsageStoreInner {
                refresh_in_progress: refreshing,
                ..Default::default()
            };
        }
        self.notify_change().await;
    }

    /// Gets the last error message.
    pub async fn error(&self) -> Option<String> {
        self.inner.read().await.error.clone()
    }

    // ========================================================================
    // Refresh Management
    // ========================================================================

    /// Marks a refresh as running.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RefreshInProgress` if one is already running.
    pub async fn start_refresh(&self) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().await;
            if inner.refresh_in_progress {
                return Err(StoreError::RefreshInProgress);
            }
            inner.refresh_in_progress = true;
        }
        self.notify_change().await;
        Ok(())
    }

    /// Marks the running refresh as finished.
    pub async fn end_refresh(&self) {
        {
            let mut inner = self.inner.write().await;
            inner.refresh_in_progress = false;
            inner.last_refresh = Some(Utc::now());
        }
        self.notify_change().await;
    }

    /// Checks if a refresh is running.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.read().await.refresh_in_progress
    }

    /// Gets the last refresh time.
    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_refresh
    }

    // ========================================================================
    // Observable
    // ========================================================================

    /// Subscribes to store changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Notifies subscribers of a change.
    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Staleness
    // ========================================================================

    /// Checks if the snapshot is older than `threshold` (or missing).
    pub async fn is_stale(&self, threshold: Duration) -> bool {
        match self.snapshot_age().await {
            Some(age) => age > chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::MAX),
            None => true,
        }
    }

    /// Gets the age of the snapshot.
    pub async fn snapshot_age(&self) -> Option<chrono::Duration> {
        self.inner
            .read()
            .await
            .snapshot_time
            .map(|t| Utc::now().signed_duration_since(t))
    }
}

// ============================================================================
// Tests
// ============================================================================
