//! Shared fixtures: a stub Gonka backend and a gateway bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bech32::{Bech32, Hrp};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use gonka_gateway::config::{Cli, Config};
use gonka_gateway::server::{bootstrap, serve};

pub const API_KEY: &str = "sk-test-key";
pub const MODEL: &str = "Qwen/QwQ-32B";
pub const OTHER_MODEL: &str = "Qwen/Qwen3-32B-FP8";

pub fn address(byte: u8) -> String {
    let hrp = Hrp::parse("gonka").unwrap();
    bech32::encode::<Bech32>(hrp, &[byte; 20]).unwrap()
}

pub fn key_hex() -> String {
    hex::encode([0x42u8; 32])
}

pub fn cli_for(endpoint: &str) -> Cli {
    Cli {
        private_key: Some(key_hex()),
        address: Some(address(1)),
        endpoint: Some(endpoint.to_string()),
        provider_address: Some(address(2)),
        api_key: Some(API_KEY.to_string()),
        host: "127.0.0.1".to_string(),
        port: 0,
        timeout_secs: 5,
        verbose: false,
        log_json: false,
    }
}

pub fn default_models() -> Vec<Value> {
    vec![
        json!({"id": MODEL}),
        json!({"id": OTHER_MODEL, "owned_by": "gonka-hub", "created": 1_700_000_000}),
    ]
}

/// How the stub answers `GET /models`.
#[derive(Clone)]
pub enum ModelsReply {
    List(Vec<Value>),
    Status(u16),
}

/// How the stub answers `POST /chat/completions`.
#[derive(Clone)]
pub enum ChatReply {
    /// A single completion whose content is the JSON body the stub received.
    Echo,
    /// This exact JSON body with status 200.
    Json(Value),
    /// An error status with a body.
    Status(u16, String),
    /// SSE events with these `data` payloads, then a clean close.
    Stream(Vec<String>),
    /// SSE events with these `data` payloads, then a connection reset.
    StreamThenAbort(Vec<String>),
    /// Content chunks every 20ms until the connection goes away.
    Endless,
}

/// Last chat call as seen on the wire.
#[derive(Clone)]
pub struct Recorded {
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct StubState {
    models: ModelsReply,
    chat: ChatReply,
    pub model_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub streams_released: AtomicUsize,
    pub last_chat: Mutex<Option<Recorded>>,
}

pub struct StubBackend {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubBackend {
    pub async fn start(models: ModelsReply, chat: ChatReply) -> Self {
        let state = Arc::new(StubState {
            models,
            chat,
            model_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            streams_released: AtomicUsize::new(0),
            last_chat: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/models", get(models_handler))
            .route("/v1/chat/completions", post(chat_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/", self.addr)
    }

    pub fn model_calls(&self) -> usize {
        self.state.model_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.state.chat_calls.load(Ordering::SeqCst)
    }

    pub fn streams_released(&self) -> usize {
        self.state.streams_released.load(Ordering::SeqCst)
    }

    pub fn last_chat(&self) -> Option<Recorded> {
        self.state.last_chat.lock().unwrap().clone()
    }

    /// Stop accepting connections.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Wait until at least `n` streams were released, up to five seconds.
    pub async fn wait_for_released(&self, n: usize) -> usize {
        for _ in 0..250 {
            if self.streams_released() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.streams_released()
    }
}

async fn models_handler(State(state): State<Arc<StubState>>) -> Response {
    state.model_calls.fetch_add(1, Ordering::SeqCst);
    match &state.models {
        ModelsReply::List(models) => Json(json!({ "models": models })).into_response(),
        ModelsReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            "catalog unavailable",
        )
            .into_response(),
    }
}

async fn chat_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_chat.lock().unwrap() = Some(Recorded {
        headers,
        body: body.clone(),
    });

    match state.chat.clone() {
        ChatReply::Echo => {
            let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            Json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": received.to_string()},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 5, "total_tokens": 8}
            }))
            .into_response()
        }
        ChatReply::Json(body) => Json(body).into_response(),
        ChatReply::Status(code, text) => {
            (StatusCode::from_u16(code).unwrap(), text).into_response()
        }
        ChatReply::Stream(payloads) => event_stream(payloads, false, state.clone()),
        ChatReply::StreamThenAbort(payloads) => event_stream(payloads, true, state.clone()),
        ChatReply::Endless => endless_stream(state.clone()),
    }
}

/// Counts a stream as released when its body is dropped.
struct ReleaseGuard(Arc<StubState>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.streams_released.fetch_add(1, Ordering::SeqCst);
    }
}

fn sse_response(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

fn event_stream(payloads: Vec<String>, abort: bool, state: Arc<StubState>) -> Response {
    let guard = ReleaseGuard(state);
    let stream = async_stream::stream! {
        let _guard = guard;
        for payload in payloads {
            yield Ok::<Bytes, std::io::Error>(Bytes::from(format!("data: {payload}\n\n")));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        if abort {
            yield Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "stub abort"));
        }
    };
    sse_response(Body::from_stream(stream))
}

fn endless_stream(state: Arc<StubState>) -> Response {
    let guard = ReleaseGuard(state);
    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            let chunk = json!({"choices": [{"index": 0, "delta": {"content": "tick"}, "finish_reason": null}]});
            yield Ok::<Bytes, std::io::Error>(Bytes::from(format!("data: {chunk}\n\n")));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    sse_response(Body::from_stream(stream))
}

/// A content chunk as the backend would send it.
pub fn content_chunk(content: &str) -> String {
    json!({
        "id": "chatcmpl-stub",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": MODEL,
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
    .to_string()
}

/// A reasoning-model chunk that carries no `content`.
pub fn reasoning_chunk(reasoning: &str) -> String {
    json!({
        "id": "chatcmpl-stub",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": MODEL,
        "choices": [{"index": 0, "delta": {"reasoning_content": reasoning}, "finish_reason": null}]
    })
    .to_string()
}

pub fn final_chunk() -> String {
    json!({
        "id": "chatcmpl-stub",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": MODEL,
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    })
    .to_string()
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestGateway {
    pub async fn start(backend: &StubBackend) -> Self {
        let config = Arc::new(Config::from_cli(&cli_for(&backend.url())).unwrap());
        let state = bootstrap(config).await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = serve(listener, state, std::future::pending::<()>()).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a chat request with the correct API key.
    pub async fn chat(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(API_KEY)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `data` payloads of an SSE body, in order.
pub fn sse_data(text: &str) -> Vec<String> {
    text.split("\n\n")
        .filter_map(|frame| {
            frame
                .lines()
                .find_map(|line| line.strip_prefix("data: "))
                .map(str::to_owned)
        })
        .collect()
}

pub fn chat_body(model: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "Say hello"}],
        "stream": stream
    })
}
