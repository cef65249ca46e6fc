pub mod health;
pub mod metrics;
pub mod storage;
pub mod vertex;

// Common response types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use common::errors::{ApiError, RemoteOperationError, ValidationError, VertexError};

/// Error body handed back to the browser extension
///
/// Always carries `error`. Strict mode adds the typed code, details and a
/// trace id, and answers with a status derived from the error kind.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl ErrorResponse {
    pub fn from_error(err: &VertexError, strict: bool) -> Self {
        if !strict {
            return Self {
                error: err.to_string(),
                code: None,
                details: None,
                trace_id: None,
                status: StatusCode::OK,
            };
        }

        let api_error = ApiError::from(err);
        Self {
            error: api_error.message,
            code: Some(api_error.code),
            details: api_error.details,
            trace_id: Some(uuid::Uuid::new_v4().to_string()),
            status: status_for(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Status used when `server.strict_status_codes` is on
pub fn status_for(err: &VertexError) -> StatusCode {
    match err {
        VertexError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        VertexError::Validation(_) => StatusCode::BAD_REQUEST,
        VertexError::Staging(_) => StatusCode::BAD_GATEWAY,
        VertexError::Remote(RemoteOperationError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        VertexError::Remote(remote) => remote
            .status()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
    }
}

/// Log a failed handler and shape its error body
pub(crate) fn failure(strict: bool, context: &str, err: VertexError) -> ErrorResponse {
    tracing::error!(error = %err, kind = err.kind(), "Error {}", context);
    ErrorResponse::from_error(&err, strict)
}

/// Query parameter that must be present and non-blank
pub(crate) fn required_param(value: Option<String>, name: &str) -> Result<String, VertexError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::MissingField(name.to_string()).into())
}
