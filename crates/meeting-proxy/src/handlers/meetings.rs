//! Meeting handlers.
//!
//! - `GET /meetings` - List mirrored meetings
//! - `GET /meetings/:id` - One meeting by local id
//! - `POST /meetings` - Schedule at the provider and mirror locally
//! - `PUT /meetings/:id` - Update at the provider, then locally
//! - `DELETE /meetings/:id` - Delete at the provider, then locally
//!
//! Path ids are always local ids.

use crate::errors::ProxyError;
use crate::models::{CreateMeetingResponse, Meeting, MeetingInput, MessageResponse};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Turn a JSON extraction failure into the standard error envelope.
fn parse_body(payload: Result<Json<MeetingInput>, JsonRejection>) -> Result<MeetingInput, ProxyError> {
    match payload {
        Ok(Json(input)) => Ok(input),
        Err(rejection) => {
            tracing::debug!(
                target: "mp.handlers.meetings",
                rejection = %rejection.body_text(),
                "Rejected meeting body"
            );
            Err(ProxyError::BadRequest(rejection.body_text()))
        }
    }
}

/// Handler for GET /meetings
#[instrument(skip_all, name = "mp.handlers.list_meetings")]
pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Meeting>>, ProxyError> {
    let meetings = state.meetings.list().await?;
    Ok(Json(meetings))
}

/// Handler for GET /meetings/:id
///
/// - 200 OK: the stored meeting
/// - 404 Not Found: no meeting with this local id
#[instrument(skip_all, name = "mp.handlers.get_meeting", fields(local_id = %id))]
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Meeting>, ProxyError> {
    let meeting = state.meetings.get(&id).await?;
    Ok(Json(meeting))
}

/// Handler for POST /meetings
///
/// - 201 Created: `{id, zoom_id}`
/// - 400 Bad Request: malformed body or invalid fields
/// - provider status: the provider refused; nothing stored
/// - 500: the provider created the meeting but it could not be stored
#[instrument(skip_all, name = "mp.handlers.create_meeting")]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MeetingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateMeetingResponse>), ProxyError> {
    let input = parse_body(payload)?;
    let local_id = Uuid::new_v4().to_string();

    let meeting = state
        .meetings
        .create(&local_id, input)
        .await?
        .into_result("create", &local_id)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateMeetingResponse {
            id: meeting.id,
            zoom_id: meeting.zoom_id,
        }),
    ))
}

/// Handler for PUT /meetings/:id
///
/// - 200 OK: `{message}`
/// - 404 Not Found: no meeting with this local id, checked before the body
/// - 400 Bad Request: malformed body or invalid fields
/// - provider status: the provider refused; nothing changed locally
/// - 500: the provider applied the change but it could not be stored
#[instrument(skip_all, name = "mp.handlers.update_meeting", fields(local_id = %id))]
pub async fn update_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MeetingInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, ProxyError> {
    let existing = state.meetings.get(&id).await?;
    let input = parse_body(payload)?;

    state
        .meetings
        .apply_update(existing, input)
        .await?
        .into_result("update", &id)?;

    Ok(Json(MessageResponse::new("Meeting updated successfully")))
}

/// Handler for DELETE /meetings/:id
///
/// - 200 OK: `{message}`
/// - 404 Not Found: no meeting with this local id
/// - provider status: the provider refused; the local row is kept
/// - 500: the provider deleted the meeting but the local row remains
#[instrument(skip_all, name = "mp.handlers.delete_meeting", fields(local_id = %id))]
pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ProxyError> {
    state
        .meetings
        .delete(&id)
        .await?
        .into_result("delete", &id)?;

    Ok(Json(MessageResponse::new("Meeting deleted successfully")))
}
