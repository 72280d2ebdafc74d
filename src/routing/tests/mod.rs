//! Test helpers shared by the routing unit tests.
//!
//! These tests drive a frozen `App` through `oneshot()`, in process and
//! without network I/O. Tests over a real socket live in `tests/`.
//!
//! ## Available Helpers
//!
//! - Configuration: `create_test_config()`, `create_config_with_toml()`
//! - Apps: `create_test_app()`, `send()`
//! - Handlers: `recorder()`, `text()`, `new_log()`
//! - Requests: `get_request()`, `post_request()`, `post_json()`, `request_with_id()`
//! - Responses: `get_body_string()`, `get_body_json()`

use crate::{App, Config, HandlerRef, handler_fn};
use axum::{body::Body, http::Request, response::Response};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

mod chain;

// ============================================================================
// Configuration Helpers
// ============================================================================

const BASE_CONFIG_TOML: &str = r#"
[http]
bind_addr = "127.0.0.1"
bind_port = 3000
max_payload_size_bytes = "1KiB"

[logging]
format = "json"
"#;

pub(crate) fn create_test_config() -> Config {
    BASE_CONFIG_TOML
        .parse()
        .expect("Failed to parse test config TOML")
}

/// Creates a test configuration with extra `[http]` keys appended.
pub(crate) fn create_config_with_toml(http_keys: &str) -> Config {
    let toml_str = format!(
        r#"
[http]
bind_addr = "127.0.0.1"
bind_port = 3000
max_payload_size_bytes = "1KiB"
{http_keys}

[logging]
format = "json"
        "#
    );

    toml_str.parse().expect("Failed to parse test config TOML")
}

// ============================================================================
// App Helpers
// ============================================================================

pub(crate) fn create_test_app() -> App {
    App::new(create_test_config())
}

/// Freezes `app` and sends a single request through the full axum stack.
pub(crate) async fn send(app: App, request: Request<Body>) -> Response {
    app.into_router()
        .expect("Failed to build router")
        .oneshot(request)
        .await
        .unwrap()
}

// ============================================================================
// Handler Helpers
// ============================================================================

pub(crate) type Log = Arc<Mutex<Vec<&'static str>>>;

pub(crate) fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records `name` in `log`, then continues the chain.
pub(crate) fn recorder(log: &Log, name: &'static str) -> HandlerRef {
    let log = Arc::clone(log);
    handler_fn(move |ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(name);
            ctx.next().await
        })
    })
}

/// Writes `body` as text and ends the chain.
pub(crate) fn text(body: &'static str) -> HandlerRef {
    handler_fn(move |ctx| Box::pin(async move { ctx.text(body) }))
}

// ============================================================================
// Request Helpers
// ============================================================================

pub(crate) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn post_json(uri: &str, json: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.into()))
        .unwrap()
}

pub(crate) fn request_with_id(uri: &str, request_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-request-id", request_id)
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// Response Helpers
// ============================================================================

pub(crate) async fn get_body_string(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

pub(crate) async fn get_body_json(response: Response) -> serde_json::Value {
    let body = get_body_string(response).await;
    serde_json::from_str(&body).expect("Response body is not JSON")
}
