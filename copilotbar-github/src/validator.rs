//! Credential validation.

use copilotbar_core::{Credential, Identity};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::api::GitHubApi;

/// Reason reported when the provider rejects the credential.
pub const INVALID_CREDENTIAL_REASON: &str = "invalid or expired credential";

/// Outcome of a validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The credential authenticates as `identity`.
    Valid {
        /// The principal.
        identity: Identity,
    },
    /// The credential cannot be used.
    Invalid {
        /// Human-readable reason.
        reason: String,
    },
}

impl Validation {
    /// Returns true for [`Validation::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Checks a credential with one identity lookup. Never persists anything.
#[derive(Clone)]
pub struct CredentialValidator {
    api: Arc<dyn GitHubApi>,
}

impl CredentialValidator {
    /// Creates a validator using `api`.
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }

    /// Validates `credential`. Failures are folded into
    /// [`Validation::Invalid`]; this never returns an error.
    #[instrument(skip_all)]
    pub async fn validate(&self, credential: &Credential) -> Validation {
        match self.api.authenticated_user(credential).await {
            Ok(identity) => {
                debug!(login = %identity.login, "Credential valid");
                Validation::Valid { identity }
            }
            Err(e) if e.is_auth_failure() => {
                warn!(hint = %credential.hint(), "Credential rejected");
                Validation::Invalid {
                    reason: INVALID_CREDENTIAL_REASON.to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Credential validation failed");
                Validation::Invalid {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, Reply, credential};

    #[tokio::test]
    async fn test_valid() {
        let api = Arc::new(MockApi::new());
        let validator = CredentialValidator::new(api.clone());

        let validation = validator.validate(&credential()).await;
        assert_eq!(
            validation,
            Validation::Valid {
                identity: Identity {
                    login: "octocat".to_string(),
                    id: Some(1),
                    name: None,
                }
            }
        );
        assert_eq!(api.user_calls(), 1);
        assert_eq!(api.network_calls(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let api = Arc::new(MockApi::new().user(vec![Reply::Status(401)]));
        let validation = CredentialValidator::new(api).validate(&credential()).await;
        assert_eq!(
            validation,
            Validation::Invalid {
                reason: INVALID_CREDENTIAL_REASON.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_other_failure_keeps_message() {
        let api = Arc::new(MockApi::new().user(vec![Reply::Status(502)]));
        let validation = CredentialValidator::new(api).validate(&credential()).await;
        match validation {
            Validation::Invalid { reason } => assert!(reason.contains("502"), "{reason}"),
            Validation::Valid { .. } => panic!("expected invalid"),
        }
    }
}
