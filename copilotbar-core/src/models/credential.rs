//! Credential and identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

// ============================================================================
// Credential
// ============================================================================

/// An opaque bearer credential.
///
/// The value is never mutated after construction and never printed: both
/// `Debug` and `Display` redact it, so it is safe to pass through tracing
/// fields and error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCredential` if the value is empty or
    /// contains interior whitespace or control characters (it would not
    /// survive as an HTTP header).
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(CoreError::InvalidCredential("empty token".to_string()));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidCredential(
                "token contains whitespace or control characters".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the raw secret. Only the HTTP layer should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the `Authorization` header value.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// A short hint safe for display (`ghp_…abcd`).
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "…".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The principal a credential authenticates as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account login (username).
    pub login: String,
    /// Numeric account ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Display name, when public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Identity {
    /// Creates an identity with only a login.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            id: None,
            name: None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} (@{})", self.login),
            None => write!(f, "@{}", self.login),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
