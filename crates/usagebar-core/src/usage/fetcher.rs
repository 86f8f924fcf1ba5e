//! Two-endpoint usage client and the service that owns the snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::parser::{parse_overage_body, parse_usage_body};
use super::types::{OverageReport, UsageReport, UsageSnapshot};
use crate::credentials::{CredentialStore, Credentials};

/// API root used when the config does not override it
pub const DEFAULT_API_ROOT: &str = "https://claude.ai/api";

/// Sender for usage snapshot updates
pub type UsageSnapshotSender = watch::Sender<UsageSnapshot>;
/// Receiver for usage snapshot updates
pub type UsageSnapshotReceiver = watch::Receiver<UsageSnapshot>;

/// Create a watch channel for usage data
pub fn usage_channel() -> (UsageSnapshotSender, UsageSnapshotReceiver) {
    watch::channel(UsageSnapshot::default())
}

/// Errors surfaced to the user as the snapshot's error message.
///
/// The `Display` text is exactly what the UI shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No session key / organization ID stored
    #[error("Add your session key and organization ID in Settings")]
    CredentialsMissing,

    /// HTTP 401 or 403
    #[error("Session expired — update your session key in Settings")]
    AuthExpired,

    /// Any other non-200 status
    #[error("Server error ({0})")]
    ServerError(u16),

    /// Body was not a JSON object
    #[error("Unexpected response format")]
    MalformedResponse,

    /// Connection, TLS, or read failure
    #[error("{0}")]
    Transport(String),

    /// The organization ID does not form a valid endpoint URL
    #[error("Invalid organization ID")]
    InvalidOrganizationId,
}

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Build a response from a status code and a text body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Blocking HTTP GET seam.
///
/// Implementations return every status code as data; only failures to get a
/// response at all are errors.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, url: &str, session_key: &str) -> Result<RawResponse, String>;
}

/// Transport backed by a shared `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport; `None` keeps ureq's default of no global timeout
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, session_key: &str) -> Result<RawResponse, String> {
        let mut response = self
            .agent
            .get(url)
            .header("Cookie", format!("sessionKey={}", session_key))
            .header("Accept", "application/json")
            .call()
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| e.to_string())?;

        Ok(RawResponse { status, body })
    }
}

/// Fully-qualified URLs for one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub usage: String,
    pub overage: String,
}

/// Build the organization-scoped endpoint URLs
pub fn endpoints(api_root: &str, org_id: &str) -> Result<Endpoints, FetchError> {
    let org = org_id.trim();
    let bad_char = |c: char| c.is_whitespace() || c.is_control() || "/?#%".contains(c);
    if org.is_empty() || org.chars().any(bad_char) {
        return Err(FetchError::InvalidOrganizationId);
    }

    let base = format!("{}/organizations/{}", api_root.trim_end_matches('/'), org);
    let urls = Endpoints {
        usage: format!("{}/usage", base),
        overage: format!("{}/overage_spend_limit", base),
    };

    for url in [&urls.usage, &urls.overage] {
        let uri: ureq::http::Uri = url
            .parse()
            .map_err(|_| FetchError::InvalidOrganizationId)?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(FetchError::InvalidOrganizationId);
        }
    }

    Ok(urls)
}

/// Outcome of one fetch: each endpoint is validated on its own
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub usage: Result<UsageReport, FetchError>,
    pub overage: Result<OverageReport, FetchError>,
}

impl FetchResult {
    /// The error to show; the usage endpoint's error wins when both fail
    pub fn error(&self) -> Option<&FetchError> {
        self.usage
            .as_ref()
            .err()
            .or_else(|| self.overage.as_ref().err())
    }

    /// Merge into the snapshot without clearing fields a failed endpoint owns
    pub fn apply_to(&self, snapshot: &mut UsageSnapshot) {
        let mut any_ok = false;
        if let Ok(report) = &self.usage {
            snapshot.apply_usage(report);
            any_ok = true;
        }
        if let Ok(report) = &self.overage {
            snapshot.apply_overage(report);
            any_ok = true;
        }
        if any_ok {
            snapshot.fetched_at = Some(Utc::now());
        }
        if let Some(err) = self.error() {
            snapshot.error = Some(err.to_string());
        }
    }
}

/// Client for the organization usage endpoints
#[derive(Clone)]
pub struct UsageClient {
    api_root: String,
    transport: Arc<dyn Transport>,
}

impl UsageClient {
    /// Create a client rooted at `api_root` (e.g. `https://claude.ai/api`)
    pub fn new(api_root: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_root: api_root.into(),
            transport,
        }
    }

    /// API root this client talks to
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Fetch both endpoints concurrently and wait for both.
    ///
    /// Only URL construction fails the whole call; everything else is
    /// reported per endpoint in the returned `FetchResult`.
    pub async fn fetch(&self, credentials: &Credentials) -> Result<FetchResult, FetchError> {
        let urls = endpoints(&self.api_root, credentials.org_id())?;
        debug!("Usage fetch: requesting {} and {}", urls.usage, urls.overage);

        let (usage, overage) = tokio::join!(
            self.get_body(urls.usage, credentials.session_key()),
            self.get_body(urls.overage, credentials.session_key()),
        );

        Ok(FetchResult {
            usage: usage.and_then(|body| parse_usage_body(&body)),
            overage: overage.and_then(|body| parse_overage_body(&body)),
        })
    }

    /// Run one blocking GET on the blocking pool and check its status
    async fn get_body(&self, url: String, session_key: &str) -> Result<Vec<u8>, FetchError> {
        let transport = Arc::clone(&self.transport);
        let key = session_key.to_string();
        let reply = tokio::task::spawn_blocking(move || transport.get(&url, &key))
            .await
            .unwrap_or_else(|e| Err(e.to_string()));
        check_status(reply)
    }
}

/// Map a raw reply to its body or the matching error
fn check_status(reply: Result<RawResponse, String>) -> Result<Vec<u8>, FetchError> {
    let response = reply.map_err(FetchError::Transport)?;
    match response.status {
        200 => Ok(response.body),
        401 | 403 => Err(FetchError::AuthExpired),
        code => Err(FetchError::ServerError(code)),
    }
}

/// Result of one `UsageService::refresh` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Both endpoints answered and parsed
    Updated,
    /// The snapshot now carries this error message
    Failed(String),
    /// Another refresh was still running; nothing was requested
    AlreadyRunning,
    /// No credentials stored; nothing was requested
    NoCredentials,
}

/// Owns the usage snapshot and is its only writer
pub struct UsageService {
    client: UsageClient,
    store: Arc<dyn CredentialStore>,
    snapshot: UsageSnapshotSender,
    in_flight: AsyncMutex<()>,
}

impl UsageService {
    /// Create a service with an empty snapshot
    pub fn new(client: UsageClient, store: Arc<dyn CredentialStore>) -> Self {
        let (snapshot, _) = usage_channel();
        Self {
            client,
            store,
            snapshot,
            in_flight: AsyncMutex::new(()),
        }
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> UsageSnapshotReceiver {
        self.snapshot.subscribe()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Credential store backing this service
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether credentials are currently stored
    pub fn has_credentials(&self) -> bool {
        match self.store.load() {
            Ok(creds) => creds.is_some(),
            Err(e) => {
                warn!("Credential store unavailable: {}", e);
                false
            }
        }
    }

    /// Fetch fresh usage and publish it.
    ///
    /// At most one refresh runs at a time; a call that arrives while another
    /// is in flight returns `AlreadyRunning` without touching the network.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Usage fetch: previous fetch still running, skipping");
            return RefreshOutcome::AlreadyRunning;
        };

        let credentials = match self.store.load() {
            Ok(Some(creds)) => creds,
            Ok(None) => {
                debug!("Usage fetch: no credentials stored");
                return RefreshOutcome::NoCredentials;
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Usage fetch: {}", message);
                self.snapshot.send_modify(|s| s.error = Some(message.clone()));
                return RefreshOutcome::Failed(message);
            }
        };

        self.snapshot.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.client.fetch(&credentials).await;

        let mut error = None;
        self.snapshot.send_modify(|s| {
            match &result {
                Ok(fetched) => fetched.apply_to(s),
                Err(e) => s.error = Some(e.to_string()),
            }
            s.loading = false;
            error = s.error.clone();
        });

        match error {
            Some(message) => {
                warn!("Usage fetch failed: {}", message);
                RefreshOutcome::Failed(message)
            }
            None => {
                let snapshot = self.snapshot.borrow();
                info!(
                    "Usage fetch: session={:?}% weekly={:?}%",
                    snapshot.session_percent, snapshot.weekly_percent
                );
                RefreshOutcome::Updated
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryStore;
    use crate::test_support::{service_with, ScriptedTransport};
    use pretty_assertions::assert_eq;

    const USAGE_BODY: &str = r#"{
        "five_hour": {"utilization": 42, "resets_at": "2026-10-19T15:00:00.000000+00:00"},
        "seven_day": {"utilization": 18, "resets_at": "2026-10-24T08:00:00Z"},
        "seven_day_opus": {"utilization": 7}
    }"#;

    const OVERAGE_BODY: &str = r#"{
        "is_enabled": true,
        "monthly_credit_limit": 5000,
        "used_credits": 1234,
        "currency": "USD"
    }"#;

    #[test]
    fn test_endpoints() {
        let urls = endpoints("https://claude.ai/api/", "abc-123").unwrap();
        assert_eq!(
            urls.usage,
            "https://claude.ai/api/organizations/abc-123/usage"
        );
        assert_eq!(
            urls.overage,
            "https://claude.ai/api/organizations/abc-123/overage_spend_limit"
        );
    }

    #[test]
    fn test_endpoints_rejects_bad_org_ids() {
        for org in ["", "   ", "a b", "a/b", "a?b", "a#b", "50%", "x\ny"] {
            assert_eq!(
                endpoints(DEFAULT_API_ROOT, org),
                Err(FetchError::InvalidOrganizationId),
                "org id {:?}",
                org
            );
        }
    }

    #[test]
    fn test_endpoints_rejects_root_without_scheme() {
        assert_eq!(
            endpoints("claude.ai/api", "abc"),
            Err(FetchError::InvalidOrganizationId)
        );
    }

    #[test]
    fn test_check_status() {
        assert_eq!(
            check_status(Ok(RawResponse::new(200, "{}"))),
            Ok(b"{}".to_vec())
        );
        assert_eq!(
            check_status(Ok(RawResponse::new(401, ""))),
            Err(FetchError::AuthExpired)
        );
        assert_eq!(
            check_status(Ok(RawResponse::new(403, ""))),
            Err(FetchError::AuthExpired)
        );
        assert_eq!(
            check_status(Ok(RawResponse::new(500, ""))),
            Err(FetchError::ServerError(500))
        );
        assert_eq!(
            check_status(Err("connection refused".to_string())),
            Err(FetchError::Transport("connection refused".to_string()))
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::AuthExpired.to_string(),
            "Session expired — update your session key in Settings"
        );
        assert_eq!(FetchError::ServerError(502).to_string(), "Server error (502)");
        assert_eq!(
            FetchError::MalformedResponse.to_string(),
            "Unexpected response format"
        );
        assert_eq!(
            FetchError::Transport("timed out".to_string()).to_string(),
            "timed out"
        );
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, USAGE_BODY))
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        let service = service_with(transport.clone(), MemoryStore::with("sk-ant-test", "org-1"));

        assert_eq!(service.refresh().await, RefreshOutcome::Updated);

        let snapshot = service.snapshot();
        assert_eq!(snapshot.session_percent, Some(42.0));
        assert_eq!(snapshot.weekly_percent, Some(18.0));
        assert_eq!(snapshot.opus_percent, Some(7.0));
        assert_eq!(snapshot.extra_usage_enabled, Some(true));
        assert_eq!(snapshot.monthly_limit_minor, Some(5000));
        assert_eq!(snapshot.used_credits_minor, Some(1234));
        assert_eq!(snapshot.currency.as_deref(), Some("USD"));
        assert!(snapshot.session_resets_at.is_some());
        assert!(snapshot.fetched_at.is_some());
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_sends_session_cookie() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, "{}"))
            .reply("/overage_spend_limit", RawResponse::new(200, "{}"));
        let service = service_with(transport.clone(), MemoryStore::with("sk-ant-xyz", "org-9"));

        service.refresh().await;

        let mut requests = transport.requests();
        requests.sort();
        assert_eq!(
            requests,
            vec![
                (
                    "https://claude.ai/api/organizations/org-9/overage_spend_limit".to_string(),
                    "sk-ant-xyz".to_string()
                ),
                (
                    "https://claude.ai/api/organizations/org-9/usage".to_string(),
                    "sk-ant-xyz".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_auth_expired_on_usage_keeps_overage_fields() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(403, "forbidden"))
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        let service = service_with(transport, MemoryStore::with("sk-ant-test", "org-1"));

        let outcome = service.refresh().await;

        let expected = FetchError::AuthExpired.to_string();
        assert_eq!(outcome, RefreshOutcome::Failed(expected.clone()));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.error, Some(expected));
        assert_eq!(snapshot.extra_usage_enabled, Some(true));
        assert_eq!(snapshot.monthly_limit_minor, Some(5000));
        assert_eq!(snapshot.used_credits_minor, Some(1234));
        assert_eq!(snapshot.currency.as_deref(), Some("USD"));
        assert!(snapshot.session_percent.is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_numbers() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, USAGE_BODY))
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        let service = service_with(transport.clone(), MemoryStore::with("sk-ant-test", "org-1"));
        service.refresh().await;

        transport.set_reply("/usage", RawResponse::new(500, ""));
        transport.set_reply("/overage_spend_limit", RawResponse::new(200, "[1, 2]"));
        let outcome = service.refresh().await;

        assert_eq!(outcome, RefreshOutcome::Failed("Server error (500)".to_string()));
        let snapshot = service.snapshot();
        assert_eq!(snapshot.session_percent, Some(42.0));
        assert_eq!(snapshot.used_credits_minor, Some(1234));
        assert_eq!(snapshot.error.as_deref(), Some("Server error (500)"));
    }

    #[tokio::test]
    async fn test_overage_error_shown_when_usage_succeeds() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, USAGE_BODY))
            .reply("/overage_spend_limit", RawResponse::new(200, "not json"));
        let service = service_with(transport, MemoryStore::with("sk-ant-test", "org-1"));

        service.refresh().await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.session_percent, Some(42.0));
        assert_eq!(snapshot.error.as_deref(), Some("Unexpected response format"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_per_endpoint() {
        let transport = ScriptedTransport::new()
            .fail("/usage", "dns error: no such host")
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        let service = service_with(transport, MemoryStore::with("sk-ant-test", "org-1"));

        service.refresh().await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("dns error: no such host"));
        assert_eq!(snapshot.monthly_limit_minor, Some(5000));
    }

    #[tokio::test]
    async fn test_next_refresh_clears_previous_error() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(401, ""))
            .reply("/overage_spend_limit", RawResponse::new(401, ""));
        let service = service_with(transport.clone(), MemoryStore::with("sk-ant-test", "org-1"));
        service.refresh().await;
        assert!(service.snapshot().error.is_some());

        transport.set_reply("/usage", RawResponse::new(200, USAGE_BODY));
        transport.set_reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        assert_eq!(service.refresh().await, RefreshOutcome::Updated);
        assert!(service.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_credentials_makes_no_request() {
        let transport = ScriptedTransport::new();
        let service = service_with(transport.clone(), MemoryStore::new());

        assert_eq!(service.refresh().await, RefreshOutcome::NoCredentials);
        assert_eq!(transport.calls(), 0);
        assert_eq!(service.snapshot(), UsageSnapshot::default());
    }

    #[tokio::test]
    async fn test_invalid_org_id_sets_error() {
        let transport = ScriptedTransport::new();
        let service = service_with(transport.clone(), MemoryStore::with("sk-ant-test", "a b"));

        let outcome = service.refresh().await;

        assert_eq!(outcome, RefreshOutcome::Failed("Invalid organization ID".to_string()));
        assert_eq!(transport.calls(), 0);
        assert!(!service.snapshot().loading);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_refresh_is_skipped() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, USAGE_BODY))
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY))
            .gated();
        let service = Arc::new(service_with(
            transport.clone(),
            MemoryStore::with("sk-ant-test", "org-1"),
        ));

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.refresh().await })
        };
        while transport.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(service.snapshot().loading);

        assert_eq!(service.refresh().await, RefreshOutcome::AlreadyRunning);

        transport.open_gate();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Updated);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let transport = ScriptedTransport::new()
            .reply("/usage", RawResponse::new(200, USAGE_BODY))
            .reply("/overage_spend_limit", RawResponse::new(200, OVERAGE_BODY));
        let service = service_with(transport, MemoryStore::with("sk-ant-test", "org-1"));
        let mut rx = service.subscribe();

        service.refresh().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().session_percent, Some(42.0));
    }
}
