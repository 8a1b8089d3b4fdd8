//! Core error types for `CopilotBar`.

use thiserror::Error;

/// Core error type for `CopilotBar` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credential rejected before any network use.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// History date key that is not `YYYY-MM-DD`.
    #[error("Invalid date key: {0}")]
    InvalidDate(String),

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
