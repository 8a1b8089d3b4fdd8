//! Account diagnostics for the `check` command.

use copilotbar_core::{Credential, Identity};
use copilotbar_fetch::FetchError;
use futures::future;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::api::{GitHubApi, SeatInfo};

/// Copilot seat state of the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeatStatus {
    /// A seat is assigned.
    Active {
        /// Seat details.
        seat: SeatInfo,
    },
    /// The seat endpoint answered 404 (or 403).
    NotEnabled,
    /// The lookup failed for another reason.
    Unknown {
        /// Error message.
        error: String,
    },
}

/// Result of [`run_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// The principal.
    pub identity: Identity,
    /// Seat state.
    pub seat: SeatStatus,
}

/// Looks up identity and seat concurrently.
///
/// # Errors
///
/// Returns the identity lookup's error; seat failures are reported in
/// [`CheckReport::seat`] instead.
#[instrument(skip_all)]
pub async fn run_check(api: &dyn GitHubApi, credential: &Credential) -> Result<CheckReport, FetchError> {
    let (identity, seat) = future::join(
        api.authenticated_user(credential),
        api.copilot_seat(credential),
    )
    .await;

    let identity = identity?;
    let seat = match seat {
        Ok(seat) => SeatStatus::Active { seat },
        Err(e) if e.is_endpoint_unavailable() => SeatStatus::NotEnabled,
        Err(e) => SeatStatus::Unknown {
            error: e.to_string(),
        },
    };
    debug!(login = %identity.login, seat = ?seat, "Check complete");

    Ok(CheckReport { identity, seat })
}
