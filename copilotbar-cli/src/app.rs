//! Wiring shared by the commands.

use anyhow::{Context, Result};
use copilotbar_core::LocalClock;
use copilotbar_fetch::FetchSettings;
use copilotbar_github::{GitHubClient, Session, UsageEngine};
use copilotbar_store::{
    CredentialStore, HistoryStore, JsonFileStore, Settings, SettingsStore, UsageStore,
};
use std::sync::Arc;
use tracing::debug;

/// Everything a command may need, built from the saved settings.
pub struct App {
    pub api: Arc<GitHubClient>,
    pub kv: Arc<JsonFileStore>,
    pub session: Arc<Session>,
}

impl App {
    /// Opens the default data file and builds the client and session.
    pub async fn load(settings: &SettingsStore) -> Result<Self> {
        let settings = settings.get().await;
        Self::with_store(&settings, Arc::new(JsonFileStore::open_default()))
    }

    fn with_store(settings: &Settings, kv: Arc<JsonFileStore>) -> Result<Self> {
        debug!(store = %kv.path().display(), api = %settings.api_base_url, "Opening app context");

        let api = Arc::new(
            GitHubClient::new(&settings.api_base_url, settings.request_timeout())
                .with_context(|| format!("invalid API base URL {}", settings.api_base_url))?,
        );
        let history = Arc::new(HistoryStore::new(kv.clone()));
        let engine = UsageEngine::new(api.clone(), history, Arc::new(LocalClock)).with_settings(
            FetchSettings {
                timeout: settings.request_timeout(),
                allow_estimate: settings.allow_estimate,
            },
        );
        let session = Session::new(
            Arc::new(engine),
            CredentialStore::new(kv.clone()),
            Arc::new(UsageStore::new()),
        );

        Ok(Self {
            api,
            kv,
            session: Arc::new(session),
        })
    }

    /// A credential store over the same data file.
    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.kv.clone())
    }

    /// The history over the same data file.
    pub fn history(&self) -> &Arc<HistoryStore> {
        self.session.engine().history()
    }
}
