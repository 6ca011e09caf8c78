//! Scriptable stand-in for the inference server's HTTP API.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use lmhost_runtime::api::{TagEntry, TagsResponse};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the fake server answers with. Tests mutate it before or between calls.
#[derive(Default)]
pub struct FakeState {
    /// Model names listed by `GET /api/tags`.
    pub tags: Mutex<Vec<String>>,
    /// NDJSON lines streamed by `POST /api/pull`.
    pub pull_lines: Mutex<Vec<String>>,
    /// Keep the pull stream open after the scripted lines.
    pub pull_hangs: AtomicBool,
    /// Non-200 status for `POST /api/pull`.
    pub pull_status: Mutex<Option<u16>>,
    /// Text fragments served by `POST /api/generate`.
    pub fragments: Mutex<Vec<String>>,
    /// Omit the `response` field in batch generate answers.
    pub omit_response: AtomicBool,
    /// Abort the generate stream after the fragments.
    pub generate_breaks: AtomicBool,
    /// Bytes served for any `GET /releases/{asset}`.
    pub release_asset: Mutex<Option<Vec<u8>>>,

    pub pull_requests: AtomicUsize,
    pub generate_requests: AtomicUsize,
    pub last_pull_body: Mutex<Option<Value>>,
    pub last_generate_body: Mutex<Option<Value>>,
}

impl FakeState {
    pub fn script_pull(&self, lines: &[Value]) {
        *self.pull_lines.lock().unwrap() = lines.iter().map(Value::to_string).collect();
    }

    pub fn script_fragments(&self, fragments: &[&str]) {
        *self.fragments.lock().unwrap() = fragments.iter().map(ToString::to_string).collect();
    }
}

pub struct FakeServer {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::start_on(0).await
    }

    pub async fn start_on(port: u16) -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/api/tags", get(tags))
            .route("/api/pull", post(pull))
            .route("/api/generate", post(generate))
            .route("/releases/:asset", get(release))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state, handle }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn tags(State(state): State<Arc<FakeState>>) -> impl IntoResponse {
    let models = state
        .tags
        .lock()
        .unwrap()
        .iter()
        .map(|name| TagEntry {
            name: name.clone(),
            size: Some(1_000),
        })
        .collect();
    axum::Json(TagsResponse { models })
}

async fn pull(State(state): State<Arc<FakeState>>, axum::Json(body): axum::Json<Value>) -> Response {
    state.pull_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_pull_body.lock().unwrap() = Some(body);

    if let Some(code) = *state.pull_status.lock().unwrap() {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, "pull rejected").into_response();
    }

    let lines: Vec<Result<Bytes, Infallible>> = state
        .pull_lines
        .lock()
        .unwrap()
        .iter()
        .map(|l| Ok(Bytes::from(format!("{l}\n"))))
        .collect();

    if state.pull_hangs.load(Ordering::SeqCst) {
        let body = stream::iter(lines).chain(stream::pending());
        Response::new(Body::from_stream(body))
    } else {
        Response::new(Body::from_stream(stream::iter(lines)))
    }
}

async fn generate(State(state): State<Arc<FakeState>>, axum::Json(body): axum::Json<Value>) -> Response {
    state.generate_requests.fetch_add(1, Ordering::SeqCst);
    let streaming = body["stream"].as_bool().unwrap_or(true);
    *state.last_generate_body.lock().unwrap() = Some(body);
    let fragments = state.fragments.lock().unwrap().clone();

    if !streaming {
        let answer = if state.omit_response.load(Ordering::SeqCst) {
            json!({ "done": true })
        } else {
            json!({ "response": fragments.concat(), "done": true })
        };
        return axum::Json(answer).into_response();
    }

    let mut lines: Vec<Result<Bytes, std::io::Error>> = fragments
        .iter()
        .map(|f| Ok(Bytes::from(format!("{}\n", json!({ "response": f, "done": false })))))
        .collect();
    if state.generate_breaks.load(Ordering::SeqCst) {
        lines.push(Err(std::io::Error::other("connection reset")));
    } else {
        lines.push(Ok(Bytes::from(format!("{}\n", json!({ "response": "", "done": true })))));
    }
    Response::new(Body::from_stream(stream::iter(lines)))
}

async fn release(State(state): State<Arc<FakeState>>, Path(_asset): Path<String>) -> Response {
    match state.release_asset.lock().unwrap().clone() {
        Some(bytes) => bytes.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
