//! End-to-end fetches through the real ureq transport against a local server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use pretty_assertions::assert_eq;
use usagebar_core::credentials::{Credentials, MemoryStore};
use usagebar_core::presentation::{classify, IconState};
use usagebar_core::usage::{
    FetchError, RefreshOutcome, UreqTransport, UsageClient, UsageService,
};

const ORG: &str = "org-e2e";
const SESSION_KEY: &str = "sk-ant-sid01-e2e";

#[derive(Clone)]
struct Server {
    usage_status: StatusCode,
    usage_body: &'static str,
    overage_status: StatusCode,
    overage_body: &'static str,
    hits: Arc<AtomicUsize>,
}

impl Server {
    fn ok(usage_body: &'static str, overage_body: &'static str) -> Self {
        Self {
            usage_status: StatusCode::OK,
            usage_body,
            overage_status: StatusCode::OK,
            overage_body,
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("sessionKey={}", SESSION_KEY))
}

async fn usage(
    State(server): State<Server>,
    Path(org): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    server.hits.fetch_add(1, Ordering::SeqCst);
    if org != ORG || !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "{}");
    }
    (server.usage_status, server.usage_body)
}

async fn overage(
    State(server): State<Server>,
    Path(org): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    server.hits.fetch_add(1, Ordering::SeqCst);
    if org != ORG || !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "{}");
    }
    (server.overage_status, server.overage_body)
}

/// Serve both endpoints on an ephemeral port; returns the API root
async fn spawn_server(server: Server) -> String {
    let app = Router::new()
        .route("/api/organizations/{org}/usage", get(usage))
        .route("/api/organizations/{org}/overage_spend_limit", get(overage))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}

fn client(api_root: String) -> UsageClient {
    UsageClient::new(
        api_root,
        Arc::new(UreqTransport::new(Some(Duration::from_secs(5)))),
    )
}

fn credentials() -> Credentials {
    Credentials::new(SESSION_KEY, ORG).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_populates_snapshot() {
    let server = Server::ok(
        r#"{
            "five_hour": {"utilization": 100.0, "resets_at": "2026-10-19T15:00:00Z"},
            "seven_day": {"utilization": 64.5, "resets_at": "2026-10-24T08:00:00Z"},
            "seven_day_opus": null
        }"#,
        r#"{"is_enabled": true, "monthly_credit_limit": 5000, "used_credits": 1250, "currency": "EUR"}"#,
    );
    let hits = Arc::clone(&server.hits);
    let root = spawn_server(server).await;

    let service = UsageService::new(
        client(root),
        Arc::new(MemoryStore::holding(credentials())),
    );

    assert_eq!(service.refresh().await, RefreshOutcome::Updated);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let snapshot = service.snapshot();
    assert_eq!(snapshot.session_percent, Some(100.0));
    assert_eq!(snapshot.weekly_percent, Some(64.5));
    assert_eq!(snapshot.opus_percent, None);
    assert_eq!(snapshot.monthly_limit_minor, Some(5000));
    assert_eq!(snapshot.used_credits_minor, Some(1250));
    assert_eq!(snapshot.currency.as_deref(), Some("EUR"));
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
    assert!(snapshot.fetched_at.is_some());

    assert_eq!(classify(&snapshot), IconState::PaidQuota);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wrong_session_key_reports_expired() {
    let root = spawn_server(Server::ok("{}", "{}")).await;
    let creds = Credentials::new("sk-ant-stale", ORG).unwrap();

    let result = client(root).fetch(&creds).await.unwrap();

    assert_eq!(result.usage, Err(FetchError::AuthExpired));
    assert_eq!(result.overage, Err(FetchError::AuthExpired));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overage_failure_keeps_usage() {
    let server = Server {
        overage_status: StatusCode::SERVICE_UNAVAILABLE,
        ..Server::ok(r#"{"five_hour": {"utilization": 12}}"#, "")
    };
    let root = spawn_server(server).await;
    let service = UsageService::new(
        client(root),
        Arc::new(MemoryStore::holding(credentials())),
    );

    assert_eq!(
        service.refresh().await,
        RefreshOutcome::Failed("Server error (503)".to_string())
    );
    let snapshot = service.snapshot();
    assert_eq!(snapshot.session_percent, Some(12.0));
    assert_eq!(snapshot.error.as_deref(), Some("Server error (503)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_object_body_is_malformed() {
    let root = spawn_server(Server::ok("[1, 2, 3]", "not json")).await;

    let result = client(root).fetch(&credentials()).await.unwrap();

    assert_eq!(result.usage, Err(FetchError::MalformedResponse));
    assert_eq!(result.overage, Err(FetchError::MalformedResponse));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_server_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(format!("http://{}/api", addr))
        .fetch(&credentials())
        .await
        .unwrap();

    assert!(matches!(result.usage, Err(FetchError::Transport(_))));
    assert!(matches!(result.overage, Err(FetchError::Transport(_))));
}
