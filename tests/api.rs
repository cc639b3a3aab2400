//! API login journey against an in-process backend

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use journey::api::{ApiClient, ApiSession};
use journey::common::config::Config;
use journey::report::FailureKind;
use journey::scenario::{self, Runner};
use journey::{ScenarioStatus, StepStatus};

const TOKEN: &str = "jwt-123";

#[derive(Clone, Copy)]
enum Backend {
    /// Behaves like the real backend
    Healthy,
    /// Login answers 200 without a token
    Tokenless,
    /// Health check never answers 200
    Starting,
    /// Profile is served without checking the token
    Open,
}

type Reply = (StatusCode, Json<Value>);

fn authorized(backend: Backend, headers: &HeaderMap) -> bool {
    if matches!(backend, Backend::Open) {
        return true;
    }
    let expected = format!("Bearer {}", TOKEN);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

fn denied() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Access denied. No token provided." })),
    )
}

async fn health(State(backend): State<Backend>) -> Reply {
    match backend {
        Backend::Starting => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        ),
        _ => (StatusCode::OK, Json(json!({ "status": "ok" }))),
    }
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Reply {
    if body["password"] != "password123" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        );
    }
    match backend {
        Backend::Tokenless => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        _ => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "token": TOKEN, "patient": { "id": 1 } }
            })),
        ),
    }
}

async fn profile(State(backend): State<Backend>, headers: HeaderMap) -> Reply {
    if !authorized(backend, &headers) {
        return denied();
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "email": "john.smith@email.com" } })),
    )
}

async fn conversations(State(backend): State<Backend>, headers: HeaderMap) -> Reply {
    if !authorized(backend, &headers) {
        return denied();
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": [{ "id": 1 }, { "id": 2 }] })),
    )
}

async fn serve(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
        .route("/api/messages/conversations", get(conversations))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, password: &str) -> Config {
    let mut config = Config::from_toml(
        "[timeouts]\ndefault_timeout_ms = 500\npoll_interval_ms = 50\n",
    )
    .unwrap();
    config.target.api_url = format!("http://{}/api", addr);
    config.credentials.email = Some("john.smith@email.com".to_string());
    config.credentials.password = Some(password.to_string());
    config
}

async fn run(backend: Backend, password: &str) -> journey::ScenarioResult {
    let addr = serve(backend).await;
    let config = config(addr, password);
    let scenario = scenario::api_login(&config).unwrap();
    let client = ApiClient::new(config.target.api_url.clone(), Duration::from_secs(2)).unwrap();
    Runner::new().run(&scenario, ApiSession::new(client)).await
}

#[tokio::test]
async fn test_api_login_passes() {
    let result = run(Backend::Healthy, "password123").await;

    assert_eq!(result.status(), ScenarioStatus::Passed, "{:?}", result);
    assert_eq!(result.steps().len(), 5);
    assert!(result.steps().iter().all(|s| s.status() == StepStatus::Passed));
}

#[tokio::test]
async fn test_rejected_login_is_errored_with_status() {
    let result = run(Backend::Healthy, "wrong").await;

    assert_eq!(result.status(), ScenarioStatus::Errored);
    assert_eq!(result.steps().len(), 3);

    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: authenticate");
    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::ActionError);
    assert_eq!(diagnostic.category.as_deref(), Some("HTTP_STATUS"));
    assert!(diagnostic.message.contains("401"));
    assert!(diagnostic.message.contains("Invalid credentials"));
}

#[tokio::test]
async fn test_missing_token_is_assertion_failure() {
    let result = run(Backend::Tokenless, "password123").await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: authenticate");
    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::AssertionFailed);
    assert_eq!(
        diagnostic.message,
        "login succeeded but the response carried no session token"
    );
}

#[tokio::test]
async fn test_unprotected_endpoint_is_assertion_failure() {
    let result = run(Backend::Open, "password123").await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 2);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: protected endpoint rejects anonymous");
    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::AssertionFailed);
    assert_eq!(
        diagnostic.message,
        "/auth/profile answered 200 to a request without a token"
    );
    assert!(diagnostic
        .evidence
        .contains(&"authenticated: false".to_string()));
}

#[tokio::test]
async fn test_unhealthy_api_times_out_first_step() {
    let result = run(Backend::Starting, "password123").await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 1);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Wait-for: API healthy");
    assert_eq!(failed.status(), StepStatus::TimedOut);
    assert!(failed.elapsed() >= Duration::from_millis(500));
}
