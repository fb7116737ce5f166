//! Meeting proxy error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and are
//! rendered as `{"error": "<message>"}`. Internal details (database errors,
//! transport failures, token problems) are logged server-side and replaced
//! with generic messages. Provider rejections are passed through.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::token_manager::TokenError;
use serde::Serialize;
use thiserror::Error;

/// Meeting proxy error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Upstream: the provider's own status
/// - BadGateway, UnreadableCreate: 502 Bad Gateway
/// - TokenUnavailable: 503 Service Unavailable
/// - Database, Reconciliation, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider could not be reached or sent an unusable response.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// The provider accepted a create (201) but its body could not be read.
    /// The meeting exists remotely; `zoom_id` is set when it could be salvaged.
    #[error("Provider created a meeting but its response was unreadable (zoom_id={zoom_id:?}): {reason}")]
    UnreadableCreate {
        zoom_id: Option<String>,
        reason: String,
    },

    /// No bearer token could be obtained.
    #[error("Token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Provider mutation succeeded but the local write failed.
    #[error("{operation} succeeded at provider but local write failed (local_id={local_id}, zoom_id={zoom_id})")]
    Reconciliation {
        operation: &'static str,
        local_id: String,
        zoom_id: String,
    },

    #[error("Internal server error")]
    Internal,
}

impl ProxyError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream { status, .. } => upstream_status(*status),
            ProxyError::BadGateway(_) | ProxyError::UnreadableCreate { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::TokenUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Database(_) | ProxyError::Reconciliation { .. } | ProxyError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Provider statuses are passed through only when they describe an error.
fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ProxyError::BadRequest(reason) => reason.clone(),
            ProxyError::NotFound(resource) => resource.clone(),
            ProxyError::Upstream { status, body } => {
                if body.trim().is_empty() {
                    format!("Meeting provider returned status {}", status)
                } else {
                    body.clone()
                }
            }
            ProxyError::BadGateway(reason) => {
                tracing::warn!(target: "mp.upstream", reason = %reason, "Meeting provider unavailable");
                "Meeting provider is unavailable".to_string()
            }
            ProxyError::UnreadableCreate { zoom_id, reason } => {
                tracing::warn!(target: "mp.upstream", zoom_id = ?zoom_id, reason = %reason, "Unreadable create response");
                "Meeting provider is unavailable".to_string()
            }
            ProxyError::TokenUnavailable(reason) => {
                tracing::warn!(target: "mp.upstream", reason = %reason, "Bearer token unavailable");
                "Unable to authenticate with meeting provider".to_string()
            }
            ProxyError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "mp.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            ProxyError::Reconciliation { operation, .. } => format!(
                "Meeting {} at provider but could not be saved locally",
                operation_past_tense(operation)
            ),
            ProxyError::Internal => "An internal error occurred".to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn operation_past_tense(operation: &str) -> &'static str {
    match operation {
        "create" => "was created",
        "update" => "was updated",
        "delete" => "was deleted",
        _ => "was changed",
    }
}

/// Convert sqlx errors to ProxyError
impl From<sqlx::Error> for ProxyError {
    fn from(err: sqlx::Error) -> Self {
        ProxyError::Database(err.to_string())
    }
}

impl From<TokenError> for ProxyError {
    fn from(err: TokenError) -> Self {
        ProxyError::TokenUnavailable(err.to_string())
    }
}
