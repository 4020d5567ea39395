//! Signed HTTP calls to the Gonka API.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::types::{BackendChatRequest, BackendChatResponse, BackendChunk, BackendModelList};
use super::BackendError;
use crate::catalog::ModelEntry;
use crate::config::Config;
use crate::signer::{HybridClock, RequestSignature, SignedBackendRequest};

pub const REQUESTER_ADDRESS_HEADER: &str = "X-Requester-Address";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Error bodies longer than this are cut before logging.
const MAX_LOGGED_BODY: usize = 2048;

/// Lazy, finite sequence of backend chunks. Dropping it closes the backend
/// connection.
pub type BackendChunkStream = Pin<Box<dyn Stream<Item = Result<BackendChunk, BackendError>> + Send>>;

/// Client for the Gonka API. Cheap to share behind `Arc`.
pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<Config>,
    clock: HybridClock,
}

impl BackendClient {
    pub fn new(config: Arc<Config>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.backend.connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            clock: HybridClock::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.backend.endpoint
    }

    /// Serialize and sign a body. Each call yields a fresh signature.
    pub fn sign<T: serde::Serialize>(&self, body: &T) -> Result<SignedBackendRequest, BackendError> {
        let bytes = serde_json::to_vec(body)?;
        Ok(SignedBackendRequest::new(
            bytes,
            &self.config.credentials,
            self.clock.now_ns(),
        ))
    }

    /// Fetch the backend's model catalog.
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>, BackendError> {
        let request = self.sign(&serde_json::json!({}))?;
        let timeout = self.config.backend.request_timeout;
        let response = self.send(Method::GET, "/models", request, Some(timeout)).await?;

        let list: BackendModelList = parse_json(response).await?;
        let total = list.models.len();
        let entries: Vec<ModelEntry> = list
            .models
            .into_iter()
            .filter_map(|raw: Value| {
                let entry = ModelEntry::from_raw(raw);
                if entry.is_none() {
                    warn!("Skipping backend model entry without a string id");
                }
                entry
            })
            .collect();

        info!(reported = total, usable = entries.len(), "Loaded models from Gonka API");
        Ok(entries)
    }

    /// Sign a chat request.
    pub fn sign_chat(&self, request: &BackendChatRequest) -> Result<SignedBackendRequest, BackendError> {
        self.sign(request)
    }

    /// Non-streaming chat completion.
    pub async fn complete_chat(
        &self,
        request: SignedBackendRequest,
    ) -> Result<BackendChatResponse, BackendError> {
        let timeout = self.config.backend.request_timeout;
        let response = self
            .send(Method::POST, "/chat/completions", request, Some(timeout))
            .await?;
        parse_json(response).await
    }

    /// Streaming chat completion. The request is sent and its status checked
    /// before returning; the body is decoded lazily as the stream is polled.
    pub async fn stream_chat(
        &self,
        request: SignedBackendRequest,
    ) -> Result<BackendChunkStream, BackendError> {
        let response = self
            .send(Method::POST, "/chat/completions", request, None)
            .await?;
        Ok(chunk_stream(response))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: SignedBackendRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = format!("{}{}", self.endpoint(), path);
        let (body, signature) = request.into_parts();

        debug!(
            method = %method,
            url = %url,
            body = %String::from_utf8_lossy(&body),
            "Gonka API request"
        );

        let mut builder = with_signature(self.http.request(method.clone(), &url), &signature).body(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!(method = %method, url = %url, error = %e, "Gonka API request failed");
            BackendError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            let body = truncate(body, MAX_LOGGED_BODY);
            error!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                body = %body,
                "Gonka API error response"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn with_signature(builder: RequestBuilder, signature: &RequestSignature) -> RequestBuilder {
    builder
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, signature.signature.as_str())
        .header(REQUESTER_ADDRESS_HEADER, signature.requester.as_str())
        .header(TIMESTAMP_HEADER, signature.timestamp_ns.to_string())
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BackendError::Transport(format!("failed to read response body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::MalformedPayload(e.to_string()))
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

/// A decoded `data` payload.
#[derive(Debug)]
pub(crate) enum StreamPayload {
    Chunk(BackendChunk),
    Done,
}

/// Interpret one event payload. Blank payloads yield `None`.
pub(crate) fn parse_stream_payload(data: &str) -> Option<Result<StreamPayload, BackendError>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(StreamPayload::Done));
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return Some(Err(BackendError::MalformedPayload(e.to_string()))),
    };

    if let Some(error) = value.get("error") {
        return Some(Err(BackendError::Upstream(error_summary(error))));
    }

    Some(
        serde_json::from_value(value)
            .map(StreamPayload::Chunk)
            .map_err(|e| BackendError::MalformedPayload(e.to_string())),
    )
}

fn error_summary(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_owned),
        other => other.to_string(),
    }
}

fn chunk_stream(response: reqwest::Response) -> BackendChunkStream {
    Box::pin(async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();
        let mut finished = false;

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Gonka API stream failed");
                    yield Err(BackendError::Stream(e.to_string()));
                    return;
                }
            };

            match parse_stream_payload(&event.data) {
                None => {}
                Some(Ok(StreamPayload::Done)) => return,
                Some(Ok(StreamPayload::Chunk(chunk))) => {
                    finished |= chunk.is_final();
                    yield Ok(chunk);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Gonka API stream returned an error event");
                    yield Err(e);
                    return;
                }
            }
        }

        if !finished {
            yield Err(BackendError::Stream(
                "connection closed before the final chunk".to_string(),
            ));
        }
    })
}
