//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body, BodyDataStream};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use videogen_relay::app_state::AppState;
use videogen_relay::config::AppConfig;
use videogen_relay::routes::api_router;
use videogen_relay::services::registry::JobRegistry;
use videogen_relay::services::webhook::WebhookClient;

pub const SECRET: &str = "test-callback-secret";

/// Configuration with short timings so failure paths finish quickly.
pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        generation_webhook_url: None,
        callback_secret: Some(SECRET.to_string()),
        video_base_url: Some("https://engine.example".to_string()),
        site_name: "test-site".to_string(),
        webhook_timeout_ms: 2_000,
        discovery_poll_interval_ms: 10,
        discovery_timeout_ms: 300,
        stream_keepalive_secs: 30,
    }
}

/// State with no webhook configured.
pub fn test_state(config: AppConfig) -> AppState {
    AppState::new(config, JobRegistry::new(), None)
}

/// State whose webhook points at `url` and whose registry is `jobs`.
pub fn state_with_webhook(config: AppConfig, jobs: Arc<JobRegistry>, url: &str) -> AppState {
    let webhook = WebhookClient::new(url, config.webhook_timeout()).expect("webhook client");
    AppState {
        config: Arc::new(config),
        jobs,
        webhook: Some(Arc::new(webhook)),
    }
}

pub fn app(state: AppState) -> Router {
    api_router(state)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("response")
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn callback(body: &Value, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/generate/callback")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("X-Callback-Secret", secret);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Reads complete server-sent event frames from a response body.
pub struct SseReader {
    body: BodyDataStream,
    buffer: String,
}

impl SseReader {
    pub fn new(response: Response) -> Self {
        Self {
            body: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next frame without its trailing blank line, or `None` once the
    /// stream has ended.
    pub async fn next_frame(&mut self, wait: Duration) -> Option<String> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame = self.buffer[..end].to_string();
                self.buffer.replace_range(..end + 2, "");
                return Some(frame);
            }
            let chunk = tokio::time::timeout(wait, self.body.next())
                .await
                .expect("timed out waiting for stream frame")?;
            let chunk = chunk.expect("stream chunk");
            self.buffer
                .push_str(std::str::from_utf8(&chunk).expect("utf-8 frame"));
        }
    }
}

/// Parse the JSON payload of a `data:` frame.
pub fn event_data(frame: &str) -> Value {
    let data = frame
        .strip_prefix("data:")
        .unwrap_or_else(|| panic!("not a data frame: {frame:?}"));
    serde_json::from_str(data.trim()).expect("event json")
}

pub fn is_comment(frame: &str) -> bool {
    frame.starts_with(':')
}

/// What the stand-in workflow webhook does when triggered.
#[derive(Clone)]
pub enum WebhookBehavior {
    /// Acknowledge, then announce `job_id` shortly afterwards.
    RegisterJob(&'static str),
    /// Acknowledge without ever announcing a job.
    AcceptOnly,
    /// Fail with the given status and body.
    Reject(StatusCode, &'static str),
    /// Sleep before answering.
    Hang(Duration),
}

#[derive(Clone)]
struct MockState {
    behavior: WebhookBehavior,
    jobs: Arc<JobRegistry>,
    received: Arc<Mutex<Vec<Value>>>,
}

pub struct MockWebhook {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl MockWebhook {
    pub fn payloads(&self) -> Vec<Value> {
        self.received.lock().expect("payload lock").clone()
    }
}

async fn mock_handler(State(state): State<MockState>, Json(payload): Json<Value>) -> Response {
    state.received.lock().expect("payload lock").push(payload);
    match state.behavior {
        WebhookBehavior::RegisterJob(job_id) => {
            let jobs = Arc::clone(&state.jobs);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                jobs.register_job(job_id);
            });
            (StatusCode::OK, "Workflow was started").into_response()
        }
        WebhookBehavior::AcceptOnly => StatusCode::OK.into_response(),
        WebhookBehavior::Reject(status, body) => (status, body).into_response(),
        WebhookBehavior::Hang(delay) => {
            tokio::time::sleep(delay).await;
            StatusCode::OK.into_response()
        }
    }
}

/// Serve a stand-in workflow webhook on an ephemeral local port.
pub async fn spawn_webhook(behavior: WebhookBehavior, jobs: Arc<JobRegistry>) -> MockWebhook {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        behavior,
        jobs,
        received: Arc::clone(&received),
    };
    let router = Router::new()
        .route("/hook", post(mock_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock webhook");
    let addr = listener.local_addr().expect("mock address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock webhook server");
    });

    MockWebhook {
        url: format!("http://{addr}/hook"),
        received,
    }
}

/// A URL on which nothing is listening.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{addr}/hook")
}
