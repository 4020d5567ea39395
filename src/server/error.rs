//! Client-facing errors in the OpenAI error envelope.
//!
//! Every per-request failure becomes
//! `{"error": {"message": ..., "type": ..., "code": ...}}`. Backend response
//! bodies, transport details and credentials never appear in these payloads.
//! An error message the backend reports explicitly is forwarded, capped.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::backend::BackendError;
use crate::catalog::CatalogError;
use crate::server::auth::AuthError;
use crate::translate::TranslateError;

/// OpenAI error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: Some(code.into()),
            },
        }
    }
}

impl From<&BackendError> for ErrorResponse {
    fn from(err: &BackendError) -> Self {
        Self::with_code(err.public_message(), "backend_error", err.code())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("The model `{0}` does not exist or is not served by this gateway")]
    ModelNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Backend(BackendError::Encode(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        match self {
            ApiError::InvalidRequest(message) => {
                ErrorResponse::with_code(message.clone(), "invalid_request_error", "invalid_request")
            }
            ApiError::Unauthorized(err) => {
                ErrorResponse::with_code(err.to_string(), "invalid_request_error", "invalid_api_key")
            }
            ApiError::ModelNotFound(_) => {
                ErrorResponse::with_code(self.to_string(), "invalid_request_error", "model_not_found")
            }
            ApiError::Backend(err) => ErrorResponse::from(err),
            ApiError::Internal(_) => {
                ErrorResponse::with_code("Internal server error", "server_error", "internal_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        let mut response = (status, Json(self.body())).into_response();
        if matches!(self, ApiError::Unauthorized(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<TranslateError> for ApiError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::NoChoices => {
                ApiError::Backend(BackendError::MalformedPayload(err.to_string()))
            }
            TranslateError::MissingModel | TranslateError::EmptyMessages => {
                ApiError::InvalidRequest(err.to_string())
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(model) => ApiError::ModelNotFound(model),
            CatalogError::Backend(err) => ApiError::Backend(err),
            CatalogError::Empty => ApiError::Internal(err.to_string()),
        }
    }
}
