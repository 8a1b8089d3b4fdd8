//! Access token storage.
//!
//! The token saved by the user lives in the key-value store under
//! [`keys::GITHUB_TOKEN`]. When none is stored, well-known environment
//! variables are consulted.

use copilotbar_core::Credential;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::kv::{KeyValueStore, keys};

/// Environment variables consulted, in order, when no token is stored.
pub const ENV_TOKEN_VARS: &[&str] = &["COPILOT_API_TOKEN", "GITHUB_TOKEN"];

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Saved in the key-value store.
    Stored,
    /// Read from an environment variable.
    Environment(&'static str),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => f.write_str("saved token"),
            Self::Environment(var) => write!(f, "${var}"),
        }
    }
}

/// Loads, saves and clears the access token.
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
    env: EnvLookup,
}

impl CredentialStore {
    /// Creates a store reading the process environment.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replaces the environment lookup. Used by tests.
    #[must_use]
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// Resolves the active credential.
    ///
    /// A stored value that is not a usable token is ignored with a warning.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<(Credential, CredentialSource)>, StoreError> {
        if let Some(credential) = self.load_stored().await? {
            debug!("Using stored token");
            return Ok(Some((credential, CredentialSource::Stored)));
        }

        for &var in ENV_TOKEN_VARS {
            let Some(raw) = (self.env)(var) else {
                continue;
            };
            match Credential::new(raw) {
                Ok(credential) => {
                    debug!(var = %var, "Using token from environment");
                    return Ok(Some((credential, CredentialSource::Environment(var))));
                }
                Err(e) => warn!(var = %var, error = %e, "Ignoring unusable token"),
            }
        }

        Ok(None)
    }

    /// Returns true if a token is saved in the key-value store.
    pub async fn has_stored(&self) -> Result<bool, StoreError> {
        Ok(self.load_stored().await?.is_some())
    }

    /// Persists a token.
    #[instrument(skip(self, credential))]
    pub async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        self.kv
            .set(keys::GITHUB_TOKEN, Value::String(credential.expose().to_string()))
            .await?;
        info!(hint = %credential.hint(), "Token saved");
        Ok(())
    }

    /// Deletes the stored token. Returns true if one existed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<bool, StoreError> {
        let existed = self.kv.delete(keys::GITHUB_TOKEN).await?;
        if existed {
            info!("Stored token cleared");
        }
        Ok(existed)
    }

    async fn load_stored(&self) -> Result<Option<Credential>, StoreError> {
        match self.kv.get(keys::GITHUB_TOKEN).await? {
            Some(Value::String(raw)) => match Credential::new(raw) {
                Ok(credential) => Ok(Some(credential)),
                Err(e) => {
                    warn!(error = %e, "Ignoring unusable stored token");
                    Ok(None)
                }
            },
            Some(Value::Null) | None => Ok(None),
            Some(_) => {
                warn!("Stored token is not a string, ignoring");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
