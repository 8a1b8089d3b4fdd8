//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Refresh already in progress.
    #[error("Refresh already in progress")]
    RefreshInProgress,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted value has an unexpected shape.
    #[error("Invalid value for key {key}: {reason}")]
    InvalidValue {
        /// The key-value store key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] copilotbar_core::CoreError),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}
