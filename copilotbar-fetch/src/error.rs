//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(HttpError),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limited by the provider.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// The credential was rejected (HTTP 401).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The endpoint does not exist or is not permitted for this principal
    /// (HTTP 404 or 403).
    #[error("Endpoint unavailable ({status}): {endpoint}")]
    EndpointUnavailable {
        /// HTTP status code.
        status: u16,
        /// Request path.
        endpoint: String,
    },

    /// Any other non-success status.
    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Request path.
        endpoint: String,
    },

    /// Invalid response from the provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The principal belongs to no organization.
    #[error("No organizations found for the authenticated user")]
    NoOrganizations,

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] copilotbar_core::CoreError),

    /// Strategy not available.
    #[error("Strategy not available: {0}")]
    StrategyNotAvailable(String),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),
}

impl FetchError {
    /// Returns true for HTTP 404/403 on a metering endpoint.
    pub fn is_endpoint_unavailable(&self) -> bool {
        matches!(self, Self::EndpointUnavailable { .. })
    }

    /// Returns true if the credential was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::DomainNotAllowed(host) => Self::DomainNotAllowed(host),
            other => Self::Http(other),
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_is_lifted() {
        let err: FetchError = HttpError::DomainNotAllowed("evil.example".to_string()).into();
        assert!(matches!(err, FetchError::DomainNotAllowed(ref h) if h == "evil.example"));
    }

    #[test]
    fn test_endpoint_unavailable_message() {
        let err = FetchError::EndpointUnavailable {
            status: 404,
            endpoint: "/copilot/usage".to_string(),
        };
        assert!(err.is_endpoint_unavailable());
        assert_eq!(err.to_string(), "Endpoint unavailable (404): /copilot/usage");
    }
}
