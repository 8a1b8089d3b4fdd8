//! Scripted [`GitHubApi`] for unit tests.

use async_trait::async_trait;
use copilotbar_core::{Credential, Identity, UsageInfo};
use copilotbar_fetch::FetchError;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use crate::api::{GitHubApi, Organization, SeatInfo, classify_status};

/// What one call answers with.
#[derive(Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Status(u16),
}

/// Replies are consumed in order; the last one repeats forever.
struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    fn new(reply: Reply<T>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([reply])),
            calls: AtomicUsize::new(0),
        }
    }

    fn set(&self, replies: Vec<Reply<T>>) {
        *self.replies.lock().unwrap() = replies.into();
    }

    fn next(&self, endpoint: &str) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        };
        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Status(code) => Err(classify_status(
                StatusCode::from_u16(code).unwrap(),
                endpoint,
                None,
                None,
            )),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockApi {
    user: Script<Identity>,
    usage: Script<UsageInfo>,
    seat: Script<SeatInfo>,
    orgs: Script<Vec<Organization>>,
    org_usage: Script<UsageInfo>,
    last_org: Mutex<Option<String>>,
    usage_gate: Option<Arc<Notify>>,
}

impl MockApi {
    /// Valid credential for `octocat`, every metering endpoint 404.
    pub(crate) fn new() -> Self {
        Self {
            user: Script::new(Reply::Ok(Identity {
                login: "octocat".to_string(),
                id: Some(1),
                name: None,
            })),
            usage: Script::new(Reply::Status(404)),
            seat: Script::new(Reply::Status(404)),
            orgs: Script::new(Reply::Ok(Vec::new())),
            org_usage: Script::new(Reply::Status(404)),
            last_org: Mutex::new(None),
            usage_gate: None,
        }
    }

    pub(crate) fn user(self, replies: Vec<Reply<Identity>>) -> Self {
        self.user.set(replies);
        self
    }

    pub(crate) fn usage(self, reply: Reply<UsageInfo>) -> Self {
        self.usage.set(vec![reply]);
        self
    }

    /// Holds every `/copilot/usage` reply until `gate` is notified.
    pub(crate) fn gate_usage(mut self, gate: Arc<Notify>) -> Self {
        self.usage_gate = Some(gate);
        self
    }

    pub(crate) fn seat(self, reply: Reply<SeatInfo>) -> Self {
        self.seat.set(vec![reply]);
        self
    }

    pub(crate) fn orgs(self, reply: Reply<Vec<Organization>>) -> Self {
        self.orgs.set(vec![reply]);
        self
    }

    pub(crate) fn org_usage(self, reply: Reply<UsageInfo>) -> Self {
        self.org_usage.set(vec![reply]);
        self
    }

    pub(crate) fn user_calls(&self) -> usize {
        self.user.calls()
    }

    pub(crate) fn usage_calls(&self) -> usize {
        self.usage.calls()
    }

    pub(crate) fn orgs_calls(&self) -> usize {
        self.orgs.calls()
    }

    pub(crate) fn org_usage_calls(&self) -> usize {
        self.org_usage.calls()
    }

    pub(crate) fn last_org(&self) -> Option<String> {
        self.last_org.lock().unwrap().clone()
    }

    pub(crate) fn network_calls(&self) -> usize {
        self.user.calls()
            + self.usage.calls()
            + self.seat.calls()
            + self.orgs.calls()
            + self.org_usage.calls()
    }
}

pub(crate) fn org(login: &str) -> Organization {
    Organization {
        login: login.to_string(),
        id: None,
    }
}

pub(crate) fn credential() -> Credential {
    Credential::new("ghp_mocktoken0001").unwrap()
}

#[async_trait]
impl GitHubApi for MockApi {
    async fn authenticated_user(&self, _credential: &Credential) -> Result<Identity, FetchError> {
        self.user.next("/user")
    }

    async fn user_usage(&self, _credential: &Credential) -> Result<UsageInfo, FetchError> {
        let reply = self.usage.next("/copilot/usage");
        if let Some(gate) = &self.usage_gate {
            gate.notified().await;
        }
        reply
    }

    async fn copilot_seat(&self, _credential: &Credential) -> Result<SeatInfo, FetchError> {
        self.seat.next("/user/copilot_billing/seat")
    }

    async fn organizations(
        &self,
        _credential: &Credential,
    ) -> Result<Vec<Organization>, FetchError> {
        self.orgs.next("/user/orgs")
    }

    async fn organization_usage(
        &self,
        _credential: &Credential,
        org: &str,
    ) -> Result<UsageInfo, FetchError> {
        *self.last_org.lock().unwrap() = Some(org.to_string());
        self.org_usage.next(&format!("/orgs/{org}/copilot/usage"))
    }
}
