//! Health check handlers.
//!
//! `/` is a liveness message; `/ready` pings storage.

use crate::models::{MessageResponse, ReadinessResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Liveness message returned by `GET /`.
pub const ROOT_MESSAGE: &str = "Zoom Backend OK!";

/// Handler for GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new(ROOT_MESSAGE))
}

/// Handler for GET /ready
///
/// Returns 200 when storage answers a ping, 503 otherwise. The body is the
/// same shape either way so probes can log it:
///
/// ```json
/// { "status": "ready", "database": "healthy" }
/// ```
#[instrument(skip_all, name = "mp.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.meetings.repository().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                database: "healthy".to_string(),
            }),
        ),
        Err(e) => {
            warn!(target: "mp.database", error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    database: "unhealthy".to_string(),
                }),
            )
        }
    }
}
