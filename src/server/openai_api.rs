//! OpenAI-compatible HTTP API.
//!
//! - POST /v1/chat/completions (auth)
//! - GET /v1/models (auth)
//! - GET /api/models (no auth, web UI)
//! - GET /health (no auth, never touches the backend)
//! - GET /metrics (no auth)
//! - GET / (chat page)

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::server::auth::require_api_key;
use crate::server::error::ApiError;
use crate::server::streaming::sse_response;
use crate::translate::openai::{ChatCompletionRequest, ModelList};
use crate::translate::request::{to_backend, validate};
use crate::translate::response::{from_backend, ChunkTranslator, ResponseContext};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: BackendClient,
    pub catalog: Arc<ModelCatalog>,
    pub metrics: Arc<Metrics>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(protected)
        .route("/api/models", get(list_models_public))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Response Types ────────────────────────────────────────────────────────

/// Raw backend model entries, as consumed by the web UI.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawModelsResponse {
    pub models: Vec<Value>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub models: usize,
}

// ─── Middleware ────────────────────────────────────────────────────────────

async fn track_requests(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let response = next.run(req).await;
    state
        .metrics
        .record_request(&endpoint, response.status().as_u16());
    response
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Parsed from the raw body so a missing Content-Type is accepted.
    let req: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON: {e}")))?;
    validate(&req)?;
    let model = state.catalog.resolve(&req.model)?.id.clone();

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = request_id,
        model = model,
        messages = req.messages.len(),
        stream = req.is_stream(),
        "Chat completion request"
    );

    let ctx = ResponseContext::new(model);
    let stream = req.is_stream();
    let body = to_backend(req);
    let signed = state.backend.sign_chat(&body)?;

    if stream {
        state.metrics.record_backend_call("chat_stream");
        let chunks = state.backend.stream_chat(signed).await?;
        Ok(sse_response(
            chunks,
            ChunkTranslator::new(ctx),
            state.metrics.clone(),
        ))
    } else {
        state.metrics.record_backend_call("chat");
        let response = state.backend.complete_chat(signed).await?;
        let response = from_backend(response, &ctx)?;
        debug!(
            request_id = request_id,
            choices = response.choices.len(),
            completion_tokens = response.usage.completion_tokens,
            "Chat completion finished"
        );
        Ok(Json(response).into_response())
    }
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(state.catalog.to_openai_list())
}

async fn list_models_public(State(state): State<Arc<AppState>>) -> Json<RawModelsResponse> {
    Json(RawModelsResponse {
        models: state.catalog.raw_entries(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        models: state.catalog.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
