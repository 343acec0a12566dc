//! End-to-end admission flow against a mock gatekeeper over real HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gatekeeper_core::UsageRecord;
use gatekeeper_server::gate::{Gate, GateConfig, TokenVerification, UsageMode};
use gatekeeper_server::network::{NetworkConfig, NetworkModule};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Mock gatekeeper
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct MockGatekeeper {
    validate_status: StatusCode,
    validate_body: Value,
    /// Sent verbatim instead of `validate_body` when set.
    validate_raw: Option<&'static str>,
    validate_delay: Duration,
    usage_status: StatusCode,
    validations: Arc<Mutex<Vec<Value>>>,
    usage: Arc<Mutex<Vec<UsageRecord>>>,
}

impl MockGatekeeper {
    fn new(validate_status: StatusCode, validate_body: Value) -> Self {
        Self {
            validate_status,
            validate_body,
            validate_raw: None,
            validate_delay: Duration::ZERO,
            usage_status: StatusCode::OK,
            validations: Arc::default(),
            usage: Arc::default(),
        }
    }

    fn usage(&self) -> Vec<UsageRecord> {
        self.usage.lock().unwrap().clone()
    }

    fn validations(&self) -> Vec<Value> {
        self.validations.lock().unwrap().clone()
    }
}

async fn validate(State(mock): State<MockGatekeeper>, Json(body): Json<Value>) -> Response {
    mock.validations.lock().unwrap().push(body);
    tokio::time::sleep(mock.validate_delay).await;
    match mock.validate_raw {
        Some(raw) => (mock.validate_status, raw).into_response(),
        None => (mock.validate_status, Json(mock.validate_body.clone())).into_response(),
    }
}

async fn usage(State(mock): State<MockGatekeeper>, Json(record): Json<UsageRecord>) -> (StatusCode, &'static str) {
    mock.usage.lock().unwrap().push(record);
    (mock.usage_status, "recorded")
}

async fn spawn_gatekeeper(mock: MockGatekeeper) -> SocketAddr {
    let router = Router::new()
        .route("/gatekeeper/validate", post(validate))
        .route("/gatekeeper/usage", post(usage))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Returns an address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ---------------------------------------------------------------------------
// Gated server under test
// ---------------------------------------------------------------------------

struct Running {
    base: String,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Running {
    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

async fn spawn_server(gatekeeper: SocketAddr, usage_mode: UsageMode) -> Running {
    spawn_server_with_policy_timeout(gatekeeper, usage_mode, Duration::from_secs(2)).await
}

async fn spawn_server_with_policy_timeout(
    gatekeeper: SocketAddr,
    usage_mode: UsageMode,
    policy_timeout: Duration,
) -> Running {
    let gate_config = GateConfig {
        gatekeeper_url: format!("http://{gatekeeper}/gatekeeper/"),
        policy_timeout,
        usage_timeout: Duration::from_secs(2),
        usage_mode,
        ..GateConfig::default()
    };
    let gate = Gate::http(
        &gate_config,
        TokenVerification::Unverified,
        &reqwest::Client::new(),
    );

    let mut module = NetworkModule::new(
        NetworkConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            drain_timeout: Duration::from_secs(2),
            ..NetworkConfig::default()
        },
        gate,
    );
    let port = module.start().await.unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(module.serve(async move {
        let _ = stopped.await;
    }));

    Running {
        base: format!("http://127.0.0.1:{port}"),
        stop: Some(stop),
        task,
    }
}

fn token(claims: &Value) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(b"unused")).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admitted_request_echoes_context_and_records_usage_once() {
    let mock = MockGatekeeper::new(StatusCode::OK, json!({"allowed": true}));
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .get(format!("{}/question", server.base))
        .bearer_auth(token(&json!({"realm": "acme", "sub": "u-1"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["realm"], "acme");
    assert_eq!(body["validation"], json!({"allowed": true}));
    assert_eq!(body["token_payload"]["sub"], "u-1");

    assert_eq!(
        mock.validations(),
        vec![json!({"organization_name": "acme", "method": "GET", "path": "/question"})]
    );
    assert_eq!(mock.usage(), vec![UsageRecord::new("acme", "GET", "/question")]);

    server.shutdown().await;
}

#[tokio::test]
async fn missing_token_never_reaches_gatekeeper() {
    let mock = MockGatekeeper::new(StatusCode::OK, json!({}));
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .get(format!("{}/question", server.base))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Missing or invalid auth token"}));
    assert!(mock.validations().is_empty());
    assert!(mock.usage().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn gatekeeper_deny_is_403_without_usage() {
    let mock = MockGatekeeper::new(StatusCode::PAYMENT_REQUIRED, json!({"reason": "quota"}));
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .post(format!("{}/question", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Unauthorized by gatekeeper"}));
    assert_eq!(mock.validations().len(), 1);
    assert!(mock.usage().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn unreachable_gatekeeper_is_500() {
    let server = spawn_server(closed_addr().await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .get(format!("{}/", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();

    assert_validation_failed(response).await;

    server.shutdown().await;
}

async fn assert_validation_failed(response: reqwest::Response) {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Gatekeeper validation failed: "), "{detail}");
}

#[tokio::test]
async fn non_json_decision_is_500_without_usage() {
    let mock = MockGatekeeper {
        validate_raw: Some("not json"),
        ..MockGatekeeper::new(StatusCode::OK, json!({}))
    };
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .get(format!("{}/question", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();

    assert_validation_failed(response).await;
    assert_eq!(mock.validations().len(), 1);
    assert!(mock.usage().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn slow_gatekeeper_times_out_as_500_without_usage() {
    let mock = MockGatekeeper {
        validate_delay: Duration::from_secs(2),
        ..MockGatekeeper::new(StatusCode::OK, json!({"allowed": true}))
    };
    let server = spawn_server_with_policy_timeout(
        spawn_gatekeeper(mock.clone()).await,
        UsageMode::Inline,
        Duration::from_millis(100),
    )
    .await;

    let response = reqwest::Client::new()
        .get(format!("{}/question", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();

    assert_validation_failed(response).await;
    assert!(mock.usage().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn failing_usage_endpoint_does_not_affect_response() {
    let mock = MockGatekeeper {
        usage_status: StatusCode::SERVICE_UNAVAILABLE,
        ..MockGatekeeper::new(StatusCode::OK, json!({"allowed": true}))
    };
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::Client::new()
        .get(format!("{}/", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Hello World");
    assert_eq!(mock.usage().len(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn detached_usage_is_flushed_before_shutdown_completes() {
    let mock = MockGatekeeper::new(StatusCode::OK, json!({"allowed": true}));
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Detached).await;

    let response = reqwest::Client::new()
        .get(format!("{}/question", server.base))
        .bearer_auth(token(&json!({"realm": "acme"})))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.shutdown().await;

    assert_eq!(mock.usage(), vec![UsageRecord::new("acme", "GET", "/question")]);
}

#[tokio::test]
async fn health_is_reachable_without_token() {
    let mock = MockGatekeeper::new(StatusCode::OK, json!({}));
    let server = spawn_server(spawn_gatekeeper(mock.clone()).await, UsageMode::Inline).await;

    let response = reqwest::get(format!("{}/health", server.base)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["state"], "ready");
    assert!(mock.validations().is_empty());

    server.shutdown().await;
}
