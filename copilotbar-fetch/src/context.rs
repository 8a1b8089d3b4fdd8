//! Fetch context passed to every strategy.
//!
//! The context carries the validated credential, the principal it
//! authenticates as, and per-run settings. It is built once per refresh.

use std::time::Duration;

use copilotbar_core::{Credential, Identity};

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Budget for a single strategy attempt.
    pub timeout: Duration,
    /// Whether the synthetic estimate may stand in for real data.
    pub allow_estimate: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            allow_estimate: true,
        }
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Context provided to fetch strategies.
pub struct FetchContext {
    credential: Credential,
    principal: Identity,
    /// Fetch settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings.
    pub fn new(credential: Credential, principal: Identity) -> Self {
        Self::builder(credential, principal).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder(credential: Credential, principal: Identity) -> FetchContextBuilder {
        FetchContextBuilder::new(credential, principal)
    }

    /// The credential to authenticate requests with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The principal the credential was validated as.
    pub fn principal(&self) -> &Identity {
        &self.principal
    }

    /// Returns the per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("principal", &self.principal.login)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
pub struct FetchContextBuilder {
    credential: Credential,
    principal: Identity,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new(credential: Credential, principal: Identity) -> Self {
        Self {
            credential,
            principal,
            settings: FetchSettings::default(),
        }
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Enables or disables the synthetic estimate.
    #[must_use]
    pub fn allow_estimate(mut self, allow: bool) -> Self {
        self.settings.allow_estimate = allow;
        self
    }

    /// Builds the fetch context.
    pub fn build(self) -> FetchContext {
        FetchContext {
            credential: self.credential,
            principal: self.principal,
            settings: self.settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
