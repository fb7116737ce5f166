//! Meeting provider (Zoom) REST client.
//!
//! Creates, updates and deletes meetings on behalf of the service account.
//!
//! # Security
//!
//! - Every request carries the bearer token from the token manager
//! - The token is never logged
//! - Timeouts prevent hanging connections

use crate::errors::ProxyError;
use crate::models::MeetingFields;
use crate::observability::metrics;
use common::secret::{ExposeSecret, SecretString};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Default timeout for provider requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider meeting type for a scheduled meeting.
const SCHEDULED_MEETING_TYPE: u8 = 2;

/// Meeting settings sent on create.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSettings {
    pub host_video: bool,
    pub participant_video: bool,
    pub join_before_host: bool,
}

impl Default for MeetingSettings {
    fn default() -> Self {
        Self {
            host_video: true,
            participant_video: true,
            join_before_host: false,
        }
    }
}

/// Body of `POST /users/me/meetings`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMeetingRequest<'a> {
    pub topic: &'a str,
    pub agenda: &'a str,
    #[serde(rename = "type")]
    pub meeting_type: u8,
    pub start_time: &'a str,
    pub duration: i32,
    pub settings: MeetingSettings,
}

impl<'a> CreateMeetingRequest<'a> {
    pub fn scheduled(fields: &'a MeetingFields) -> Self {
        Self {
            topic: &fields.topic,
            agenda: &fields.agenda,
            meeting_type: SCHEDULED_MEETING_TYPE,
            start_time: &fields.start_time,
            duration: fields.duration,
            settings: MeetingSettings::default(),
        }
    }
}

/// Body of `PATCH /meetings/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMeetingRequest<'a> {
    pub topic: &'a str,
    pub agenda: &'a str,
    pub start_time: &'a str,
    pub duration: i32,
}

impl<'a> From<&'a MeetingFields> for UpdateMeetingRequest<'a> {
    fn from(fields: &'a MeetingFields) -> Self {
        Self {
            topic: &fields.topic,
            agenda: &fields.agenda,
            start_time: &fields.start_time,
            duration: fields.duration,
        }
    }
}

/// Meeting as returned by the provider on create.
///
/// Echoed fields are optional; callers fall back to what they sent.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoomMeeting {
    pub id: i64,
    pub join_url: String,
    pub start_url: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub agenda: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
}

/// HTTP client for the provider's meeting API.
#[derive(Clone)]
pub struct ZoomClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// API base URL without a trailing slash (e.g., "https://api.zoom.us/v2").
    base_url: String,
}

impl ZoomClient {
    /// Create a new provider client.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                error!(target: "mp.services.zoom_client", error = %e, "Failed to build HTTP client");
                ProxyError::Internal
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Schedule a meeting for the service account.
    ///
    /// # Errors
    ///
    /// - `ProxyError::Upstream` if the provider answers anything but 201
    /// - `ProxyError::BadGateway` on transport failure
    /// - `ProxyError::UnreadableCreate` if the 201 body cannot be decoded
    #[instrument(skip_all, name = "mp.zoom.create_meeting")]
    pub async fn create_meeting(
        &self,
        token: &SecretString,
        fields: &MeetingFields,
    ) -> Result<ZoomMeeting, ProxyError> {
        let url = format!("{}/users/me/meetings", self.base_url);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&CreateMeetingRequest::scheduled(fields))
            .send()
            .await;
        let response = expect_status("create_meeting", start, response, StatusCode::CREATED).await?;

        let body = response.text().await.map_err(|e| {
            error!(target: "mp.services.zoom_client", error = %e, "Failed to read created meeting");
            ProxyError::UnreadableCreate {
                zoom_id: None,
                reason: format!("body unreadable: {e}"),
            }
        })?;

        serde_json::from_str::<ZoomMeeting>(&body).map_err(|e| {
            let zoom_id = salvage_meeting_id(&body);
            error!(
                target: "mp.services.zoom_client",
                error = %e,
                zoom_id = ?zoom_id,
                "Failed to parse created meeting"
            );
            ProxyError::UnreadableCreate {
                zoom_id,
                reason: format!("invalid create response: {e}"),
            }
        })
    }

    /// Change the editable fields of a provider meeting.
    ///
    /// # Errors
    ///
    /// - `ProxyError::Upstream` if the provider answers anything but 204
    /// - `ProxyError::BadGateway` on transport failure
    #[instrument(skip_all, name = "mp.zoom.update_meeting", fields(zoom_id = %remote_id))]
    pub async fn update_meeting(
        &self,
        token: &SecretString,
        remote_id: &str,
        fields: &MeetingFields,
    ) -> Result<(), ProxyError> {
        let url = format!("{}/meetings/{}", self.base_url, remote_id);
        let start = Instant::now();

        let response = self
            .client
            .patch(&url)
            .bearer_auth(token.expose_secret())
            .json(&UpdateMeetingRequest::from(fields))
            .send()
            .await;
        expect_status("update_meeting", start, response, StatusCode::NO_CONTENT).await?;

        Ok(())
    }

    /// Delete a provider meeting.
    ///
    /// # Errors
    ///
    /// - `ProxyError::Upstream` if the provider answers anything but 204
    /// - `ProxyError::BadGateway` on transport failure
    #[instrument(skip_all, name = "mp.zoom.delete_meeting", fields(zoom_id = %remote_id))]
    pub async fn delete_meeting(
        &self,
        token: &SecretString,
        remote_id: &str,
    ) -> Result<(), ProxyError> {
        let url = format!("{}/meetings/{}", self.base_url, remote_id);
        let start = Instant::now();

        let response = self
            .client
            .delete(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await;
        expect_status("delete_meeting", start, response, StatusCode::NO_CONTENT).await?;

        Ok(())
    }
}

/// Best-effort read of `id` from a create body that failed to decode.
fn salvage_meeting_id(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body).ok()?.get("id")? {
        serde_json::Value::Number(id) => Some(id.to_string()),
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}

/// Map the provider response to an error unless it has the expected status.
async fn expect_status(
    operation: &str,
    start: Instant,
    response: Result<Response, reqwest::Error>,
    expected: StatusCode,
) -> Result<Response, ProxyError> {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            metrics::record_zoom_request(operation, "error", start.elapsed());
            warn!(
                target: "mp.services.zoom_client",
                operation = operation,
                error = %e,
                timeout = e.is_timeout(),
                "Provider request failed"
            );
            return Err(ProxyError::BadGateway(format!("{operation} failed: {e}")));
        }
    };

    let status = response.status();
    if status == expected {
        metrics::record_zoom_request(operation, "success", start.elapsed());
        return Ok(response);
    }

    metrics::record_zoom_request(operation, "rejected", start.elapsed());
    let body = response.text().await.unwrap_or_default();
    warn!(
        target: "mp.services.zoom_client",
        operation = operation,
        status = %status,
        body = %body,
        "Provider rejected request"
    );

    Err(ProxyError::Upstream {
        status: status.as_u16(),
        body,
    })
}
