//! Errors surfaced by the usage engine.

use copilotbar_fetch::FetchError;
use copilotbar_store::StoreError;
use thiserror::Error;

/// Error returned by [`UsageEngine::fetch`](crate::UsageEngine::fetch).
///
/// Unavailable metering endpoints never show up here; they are absorbed by
/// the fallback chain.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The credential was rejected. Terminal until the user replaces it.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Anything else that went wrong on the way to a snapshot. Retried on the
    /// next tick.
    #[error(transparent)]
    Transient(#[from] FetchError),

    /// The history could not be read or written.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl UsageError {
    /// Returns true if the credential needs replacing.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}
