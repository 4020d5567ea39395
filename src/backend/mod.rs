//! Gonka API client.
//!
//! - [`client`]: signed unary and streaming calls
//! - [`types`]: backend request/response shapes

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::{BackendChunkStream, BackendClient};

/// Longest backend-reported error message forwarded to clients, in chars.
const MAX_PUBLIC_UPSTREAM_CHARS: usize = 200;

/// Backend failures, all recoverable per request.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("malformed backend payload: {0}")]
    MalformedPayload(String),

    #[error("backend reported an error: {0}")]
    Upstream(String),

    #[error("backend stream interrupted: {0}")]
    Stream(String),

    #[error("failed to encode backend request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BackendError {
    /// Stable machine-readable code for client-facing error bodies.
    pub fn code(&self) -> String {
        match self {
            BackendError::Transport(_) => "backend_unreachable".to_string(),
            BackendError::Status { status, .. } => format!("backend_status_{status}"),
            BackendError::MalformedPayload(_) => "backend_malformed_response".to_string(),
            BackendError::Upstream(_) => "backend_error".to_string(),
            BackendError::Stream(_) => "backend_stream_interrupted".to_string(),
            BackendError::Encode(_) => "request_encoding_failed".to_string(),
        }
    }

    /// Message safe to show to clients. Backend bodies and transport details
    /// stay in the logs; a backend-reported error message is forwarded with
    /// control characters blanked and its length capped.
    pub fn public_message(&self) -> String {
        match self {
            BackendError::Transport(_) => "The Gonka backend could not be reached".to_string(),
            BackendError::Status { status, .. } => {
                format!("The Gonka backend rejected the request with HTTP {status}")
            }
            BackendError::MalformedPayload(_) => {
                "The Gonka backend returned an unreadable response".to_string()
            }
            BackendError::Upstream(message) => {
                format!("The Gonka backend reported: {}", sanitize_upstream(message))
            }
            BackendError::Stream(_) => {
                "The Gonka backend stream ended before completion".to_string()
            }
            BackendError::Encode(_) => "The request could not be encoded".to_string(),
        }
    }
}

fn sanitize_upstream(message: &str) -> String {
    let mut chars = message.trim().chars();
    let mut out: String = chars
        .by_ref()
        .take(MAX_PUBLIC_UPSTREAM_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}
