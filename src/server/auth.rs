//! API-key gate for the OpenAI endpoints.
//!
//! Accepts `Authorization: Bearer <key>` or `Authorization: <key>`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use crate::config::ApiKey;
use crate::server::error::ApiError;
use crate::server::openai_api::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing API key. Provide an Authorization header with a Bearer token.")]
    Missing,

    #[error("Invalid API key")]
    Invalid,
}

/// Strip an optional `Bearer` scheme (case-insensitive) from a header value.
pub fn extract_token(header_value: &str) -> &str {
    let value = header_value.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return "";
    }
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}

/// Check a raw `Authorization` header value against the configured key.
pub fn authorize(header_value: Option<&str>, expected: &ApiKey) -> Result<(), AuthError> {
    let token = header_value.map(extract_token).unwrap_or_default();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    if !expected.matches(token) {
        return Err(AuthError::Invalid);
    }
    Ok(())
}

/// Middleware guarding the protected routes.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match authorize(header_value, &state.config.api_key) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            warn!(
                path = %req.uri().path(),
                reason = %err,
                "Unauthorized API request"
            );
            ApiError::from(err).into_response()
        }
    }
}
