//! GitHub REST client.
//!
//! Only the endpoints the fallback chain and the `check` command need. Every
//! request carries the bearer credential, so the client is restricted to
//! `github.com` hosts.

use async_trait::async_trait;
use copilotbar_core::{Credential, Identity, UsageInfo};
use copilotbar_fetch::{FetchError, HttpClient, HttpError, ResponseExt};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// GitHub API version header value.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Media type GitHub recommends for REST calls.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

const API_VERSION_HEADER: &str = "x-github-api-version";
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Hosts the credential may be sent to.
const ALLOWED_DOMAIN: &str = "github.com";

// ============================================================================
// Response Types
// ============================================================================

/// Copilot seat assignment of the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    /// Plan type, e.g. `business`.
    #[serde(default)]
    pub plan_type: Option<String>,
    /// When the seat was assigned.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last time Copilot was used.
    #[serde(default)]
    pub last_activity_at: Option<String>,
    /// Editor of the last activity.
    #[serde(default)]
    pub last_activity_editor: Option<String>,
    /// Date the seat will be removed, if pending.
    #[serde(default)]
    pub pending_cancellation_date: Option<String>,
}

/// An organization the principal belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization login.
    pub login: String,
    /// Numeric id.
    #[serde(default)]
    pub id: Option<u64>,
}

/// One day of organization metrics.
#[derive(Debug, Deserialize)]
struct DayMetrics {
    day: String,
    #[serde(default)]
    total_acceptances_count: u64,
}

// ============================================================================
// API Trait
// ============================================================================

/// The GitHub calls the rest of the crate depends on.
///
/// Errors follow one convention: 401 is `AuthenticationFailed`, 404 and 403
/// are `EndpointUnavailable`, 429 (or 403 with an exhausted quota) is
/// `RateLimited`, anything else non-2xx is `UnexpectedStatus`.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `GET /user`.
    async fn authenticated_user(&self, credential: &Credential) -> Result<Identity, FetchError>;

    /// `GET /copilot/usage`.
    async fn user_usage(&self, credential: &Credential) -> Result<UsageInfo, FetchError>;

    /// `GET /user/copilot_billing/seat`.
    async fn copilot_seat(&self, credential: &Credential) -> Result<SeatInfo, FetchError>;

    /// `GET /user/orgs`.
    async fn organizations(&self, credential: &Credential)
    -> Result<Vec<Organization>, FetchError>;

    /// `GET /orgs/{org}/copilot/usage`.
    async fn organization_usage(
        &self,
        credential: &Credential,
        org: &str,
    ) -> Result<UsageInfo, FetchError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// [`GitHubApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
    base: Url,
}

impl GitHubClient {
    /// Creates a client for `base_url` (normally `https://api.github.com`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(format!("{base_url} cannot be a base URL")).into());
        }

        let http = HttpClient::with_timeout(timeout)?
            .allow_domains(vec![ALLOWED_DOMAIN.to_string()]);

        Ok(Self { http, base })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<String, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    #[instrument(skip(self, credential))]
    async fn get_json(&self, credential: &Credential, segments: &[&str]) -> Result<Value, FetchError> {
        let path = format!("/{}", segments.join("/"));
        let url = self.endpoint(segments)?;

        let response = self
            .http
            .get_with_headers(&url, request_headers(credential)?)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let quota_left = response
                .headers()
                .get(RATE_LIMIT_REMAINING_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let err = classify_status(
                status,
                &path,
                quota_left.as_deref(),
                response.retry_after_secs(),
            );
            debug!(status = %status, error = %err, "Request failed");
            return Err(err);
        }

        let body = response.text().await.map_err(HttpError::from)?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, endpoint = %path, "Response is not JSON");
            FetchError::InvalidResponse(format!("{path}: {e}"))
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn authenticated_user(&self, credential: &Credential) -> Result<Identity, FetchError> {
        let value = self.get_json(credential, &["user"]).await?;
        serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(format!("/user: {e}")))
    }

    async fn user_usage(&self, credential: &Credential) -> Result<UsageInfo, FetchError> {
        let value = self.get_json(credential, &["copilot", "usage"]).await?;
        parse_usage_body(value)
    }

    async fn copilot_seat(&self, credential: &Credential) -> Result<SeatInfo, FetchError> {
        let value = self
            .get_json(credential, &["user", "copilot_billing", "seat"])
            .await?;
        serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(format!("/user/copilot_billing/seat: {e}")))
    }

    async fn organizations(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Organization>, FetchError> {
        let value = self.get_json(credential, &["user", "orgs"]).await?;
        serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(format!("/user/orgs: {e}")))
    }

    async fn organization_usage(
        &self,
        credential: &Credential,
        org: &str,
    ) -> Result<UsageInfo, FetchError> {
        let value = self
            .get_json(credential, &["orgs", org, "copilot", "usage"])
            .await?;
        parse_usage_body(value)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the headers sent with every request. The authorization value is
/// marked sensitive so it never appears in debug output.
fn request_headers(credential: &Credential) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_static(GITHUB_API_VERSION),
    );

    let mut auth = HeaderValue::from_str(&credential.bearer_header()).map_err(|_| {
        FetchError::AuthenticationFailed("token is not a valid header value".to_string())
    })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    Ok(headers)
}

/// Maps a non-success status to the error the fallback chain reasons about.
pub(crate) fn classify_status(
    status: StatusCode,
    endpoint: &str,
    quota_left: Option<&str>,
    retry_after: Option<u64>,
) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED => {
            FetchError::AuthenticationFailed(format!("{endpoint} rejected the credential"))
        }
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { retry_after },
        StatusCode::FORBIDDEN if quota_left.map(str::trim) == Some("0") => {
            FetchError::RateLimited { retry_after }
        }
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => FetchError::EndpointUnavailable {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        },
        _ => FetchError::UnexpectedStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        },
    }
}

/// Interprets a usage response.
///
/// An object is read as [`UsageInfo`] directly. An array is read as
/// per-day organization metrics: accepted completions become
/// `daily_usage`, and their sum over the latest reported month becomes
/// `total_completions_used`. The original array is kept under `days`.
pub(crate) fn parse_usage_body(value: Value) -> Result<UsageInfo, FetchError> {
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(format!("usage object: {e}"))),
        Value::Array(days) => Ok(usage_from_days(days)),
        other => Err(FetchError::InvalidResponse(format!(
            "expected a usage object or array, got {}",
            json_kind(&other)
        ))),
    }
}

fn usage_from_days(days: Vec<Value>) -> UsageInfo {
    let mut daily = BTreeMap::new();
    for day in &days {
        match DayMetrics::deserialize(day) {
            Ok(metrics) => {
                daily.insert(metrics.day, metrics.total_acceptances_count);
            }
            Err(e) => debug!(error = %e, "Skipping unreadable day entry"),
        }
    }

    // Keys are YYYY-MM-DD, so the last one carries the latest month.
    let used = daily.keys().next_back().map(|latest| {
        let month = latest.get(..7).unwrap_or(latest.as_str());
        daily
            .iter()
            .filter(|(day, _)| day.starts_with(month))
            .fold(0u64, |total, (_, count)| total.saturating_add(*count))
    });

    let mut info = UsageInfo {
        total_completions_used: used,
        daily_usage: (!daily.is_empty()).then_some(daily),
        ..UsageInfo::default()
    };
    info.extra.insert("days".to_string(), Value::Array(days));
    info
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
