//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Auto-refresh cadence.
    pub refresh_cadence: RefreshCadence,

    /// Log level used when neither `--verbose` nor `RUST_LOG` is given.
    pub log_level: LogLevel,

    /// REST API base URL. Only hosts under `github.com` are accepted.
    pub api_base_url: String,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Whether a synthetic estimate may stand in when no metering endpoint
    /// answers.
    pub allow_estimate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_cadence: RefreshCadence::default(),
            log_level: LogLevel::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            allow_estimate: true,
        }
    }
}

impl Settings {
    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Refresh cadence options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCadence {
    /// Manual refresh only.
    Manual,
    /// Every minute.
    OneMinute,
    /// Every two minutes.
    TwoMinutes,
    /// Every five minutes.
    #[default]
    FiveMinutes,
    /// Every fifteen minutes.
    FifteenMinutes,
    /// Every thirty minutes.
    ThirtyMinutes,
}

impl RefreshCadence {
    /// Returns the duration, or None for manual.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            RefreshCadence::Manual => None,
            RefreshCadence::OneMinute => Some(Duration::from_secs(60)),
            RefreshCadence::TwoMinutes => Some(Duration::from_secs(120)),
            RefreshCadence::FiveMinutes => Some(Duration::from_secs(300)),
            RefreshCadence::FifteenMinutes => Some(Duration::from_secs(900)),
            RefreshCadence::ThirtyMinutes => Some(Duration::from_secs(1800)),
        }
    }

    /// All available cadences.
    pub fn all() -> &'static [RefreshCadence] {
        &[
            RefreshCadence::Manual,
            RefreshCadence::OneMinute,
            RefreshCadence::TwoMinutes,
            RefreshCadence::FiveMinutes,
            RefreshCadence::FifteenMinutes,
            RefreshCadence::ThirtyMinutes,
        ]
    }

    /// Short form accepted on the command line.
    pub fn short_name(&self) -> &'static str {
        match self {
            RefreshCadence::Manual => "manual",
            RefreshCadence::OneMinute => "1m",
            RefreshCadence::TwoMinutes => "2m",
            RefreshCadence::FiveMinutes => "5m",
            RefreshCadence::FifteenMinutes => "15m",
            RefreshCadence::ThirtyMinutes => "30m",
        }
    }
}

impl std::fmt::Display for RefreshCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshCadence::Manual => write!(f, "Manual"),
            RefreshCadence::OneMinute => write!(f, "1 minute"),
            RefreshCadence::TwoMinutes => write!(f, "2 minutes"),
            RefreshCadence::FiveMinutes => write!(f, "5 minutes"),
            RefreshCadence::FifteenMinutes => write!(f, "15 minutes"),
            RefreshCadence::ThirtyMinutes => write!(f, "30 minutes"),
        }
    }
}

impl FromStr for RefreshCadence {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|cadence| {
                cadence.short_name() == wanted
                    || serde_json::to_value(cadence)
                        .ok()
                        .and_then(|v| v.as_str().map(|name| name == wanted))
                        .unwrap_or(false)
            })
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::all().iter().map(Self::short_name).collect();
                StoreError::Parse(format!(
                    "unknown refresh cadence '{s}' (expected one of: {})",
                    valid.join(", ")
                ))
            })
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings with persistence and change notification.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store holding defaults for `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path. A missing or unreadable file yields
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file's existence cannot be checked.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if tokio::fs::try_exists(&path).await? {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// The file this store saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Restores defaults (in memory; call [`save`](Self::save) to persist).
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Subscribes to settings changes.
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
    // Convenience Methods
    // ========================================================================

    /// Gets the refresh cadence.
    pub async fn refresh_cadence(&self) -> RefreshCadence {
        self.settings.read().await.refresh_cadence
    }

    /// Sets the refresh cadence.
    pub async fn set_refresh_cadence(&self, cadence: RefreshCadence) {
        self.update(|s| s.refresh_cadence = cadence).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.refresh_cadence, RefreshCadence::FiveMinutes);
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert!(settings.allow_estimate);
    }

    #[test]
    fn test_refresh_cadence_duration() {
        assert_eq!(RefreshCadence::Manual.as_duration(), None);
        assert_eq!(
            RefreshCadence::FiveMinutes.as_duration(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_refresh_cadence_parse() {
        assert_eq!("5m".parse::<RefreshCadence>().unwrap(), RefreshCadence::FiveMinutes);
        assert_eq!(
            "fifteen_minutes".parse::<RefreshCadence>().unwrap(),
            RefreshCadence::FifteenMinutes
        );
        assert_eq!(" Manual ".parse::<RefreshCadence>().unwrap(), RefreshCadence::Manual);
        assert!("7m".parse::<RefreshCadence>().is_err());
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_settings_file() {
        let settings: Settings =
            serde_json::from_str(r#"{"refresh_cadence":"one_minute"}"#).unwrap();
        assert_eq!(settings.refresh_cadence, RefreshCadence::OneMinute);
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[tokio::test]
    async fn test_settings_store_update_notifies() {
        let store = SettingsStore::new(PathBuf::from("/tmp/copilotbar_test_settings.json"));
        let mut rx = store.subscribe();

        store.set_refresh_cadence(RefreshCadence::OneMinute).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(store.refresh_cadence().await, RefreshCadence::OneMinute);
    }

    #[tokio::test]
    async fn test_reset() {
        let store = SettingsStore::new(PathBuf::from("/tmp/copilotbar_test_reset.json"));
        store
            .update(|s| {
                s.allow_estimate = false;
                s.request_timeout_secs = 5;
            })
            .await;
        store.reset().await;
        assert_eq!(store.get().await, Settings::default());
    }
}
