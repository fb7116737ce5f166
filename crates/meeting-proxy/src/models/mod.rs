//! Meeting proxy models.
//!
//! Contains the stored meeting record, request validation, and response
//! bodies shared by the handlers.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Local (provider-free) date-time form accepted for `start_time`.
pub const LOCAL_START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A meeting as mirrored in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    /// Local identifier (UUID v4 string).
    pub id: String,

    /// Identifier assigned by the meeting provider.
    pub zoom_id: String,

    pub topic: String,

    pub agenda: String,

    pub start_time: String,

    /// Length in minutes.
    pub duration: i32,

    pub join_url: String,

    pub start_url: String,
}

/// The editable part of a meeting, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingFields {
    pub topic: String,
    pub agenda: String,
    pub start_time: String,
    pub duration: i32,
}

/// Request body for create and update.
///
/// Every field is optional at the JSON level so that a missing field is
/// reported by [`MeetingInput::validate`] with a useful message instead of a
/// generic deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingInput {
    pub topic: Option<String>,
    pub agenda: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<i64>,
}

impl MeetingInput {
    /// Check required fields and normalize the input.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the first invalid field.
    pub fn validate(self) -> Result<MeetingFields, String> {
        let topic = self.topic.unwrap_or_default().trim().to_string();
        if topic.is_empty() {
            return Err("topic is required".to_string());
        }

        let start_time = match self.start_time {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => return Err("start_time is required".to_string()),
        };
        if !is_valid_start_time(&start_time) {
            return Err(format!(
                "start_time must be RFC 3339 or YYYY-MM-DDTHH:MM:SS (got '{start_time}')"
            ));
        }

        let duration = match self.duration {
            None => return Err("duration is required".to_string()),
            Some(minutes) if minutes <= 0 => {
                return Err("duration must be a positive number of minutes".to_string())
            }
            Some(minutes) => i32::try_from(minutes)
                .map_err(|_| "duration is too large".to_string())?,
        };

        Ok(MeetingFields {
            topic,
            agenda: self.agenda.unwrap_or_default(),
            start_time,
            duration,
        })
    }
}

/// Accepts RFC 3339 timestamps and the provider's zone-less local form.
pub fn is_valid_start_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, LOCAL_START_TIME_FORMAT).is_ok()
}

/// Response body for a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeetingResponse {
    pub id: String,
    pub zoom_id: String,
}

/// Plain message body, used by `/` and successful update/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// "healthy" or "unhealthy".
    pub database: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn input(topic: &str, start_time: &str, duration: i64) -> MeetingInput {
        MeetingInput {
            topic: Some(topic.to_string()),
            agenda: None,
            start_time: Some(start_time.to_string()),
            duration: Some(duration),
        }
    }

    #[test]
    fn test_validate_accepts_minimal_input() {
        let fields = input("Sprint Review", "2025-01-10T10:00:00Z", 30)
            .validate()
            .unwrap();

        assert_eq!(fields.topic, "Sprint Review");
        assert_eq!(fields.agenda, "");
        assert_eq!(fields.start_time, "2025-01-10T10:00:00Z");
        assert_eq!(fields.duration, 30);
    }

    #[test]
    fn test_validate_keeps_agenda() {
        let mut body = input("Planning", "2025-03-01T09:30:00", 45);
        body.agenda = Some("Backlog grooming".to_string());

        let fields = body.validate().unwrap();
        assert_eq!(fields.agenda, "Backlog grooming");
        assert_eq!(fields.start_time, "2025-03-01T09:30:00");
    }

    #[test]
    fn test_validate_trims_topic() {
        let fields = input("  Standup  ", "2025-01-10T10:00:00+02:00", 15)
            .validate()
            .unwrap();
        assert_eq!(fields.topic, "Standup");
    }

    #[test]
    fn test_validate_rejects_missing_or_blank_topic() {
        let mut body = input("x", "2025-01-10T10:00:00Z", 30);
        body.topic = None;
        assert_eq!(body.validate().unwrap_err(), "topic is required");

        let err = input("   ", "2025-01-10T10:00:00Z", 30)
            .validate()
            .unwrap_err();
        assert_eq!(err, "topic is required");
    }

    #[test]
    fn test_validate_rejects_missing_start_time() {
        let mut body = input("Demo", "", 30);
        assert_eq!(body.clone().validate().unwrap_err(), "start_time is required");

        body.start_time = None;
        assert_eq!(body.validate().unwrap_err(), "start_time is required");
    }

    #[test]
    fn test_validate_rejects_unparseable_start_time() {
        for value in ["tomorrow", "2025-01-10", "10/01/2025 10:00", "2025-13-40T99:00:00"] {
            let err = input("Demo", value, 30).validate().unwrap_err();
            assert!(err.starts_with("start_time must be"), "{value}: {err}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        let mut body = input("Demo", "2025-01-10T10:00:00Z", 30);
        body.duration = None;
        assert_eq!(body.validate().unwrap_err(), "duration is required");

        assert!(input("Demo", "2025-01-10T10:00:00Z", 0)
            .validate()
            .unwrap_err()
            .contains("positive"));
        assert!(input("Demo", "2025-01-10T10:00:00Z", -5)
            .validate()
            .unwrap_err()
            .contains("positive"));
        assert_eq!(
            input("Demo", "2025-01-10T10:00:00Z", i64::from(i32::MAX) + 1)
                .validate()
                .unwrap_err(),
            "duration is too large"
        );
    }

    #[test]
    fn test_meeting_input_deserializes_partial_body() {
        let body: MeetingInput = serde_json::from_str(r#"{"topic":"Retro"}"#).unwrap();
        assert_eq!(body.topic.as_deref(), Some("Retro"));
        assert!(body.start_time.is_none());
        assert!(body.duration.is_none());
    }

    #[test]
    fn test_meeting_serializes_all_fields() {
        let meeting = Meeting {
            id: "local-1".to_string(),
            zoom_id: "999".to_string(),
            topic: "Sprint Review".to_string(),
            agenda: String::new(),
            start_time: "2025-01-10T10:00:00Z".to_string(),
            duration: 30,
            join_url: "https://zoom.us/j/999".to_string(),
            start_url: "https://zoom.us/s/999".to_string(),
        };

        let json = serde_json::to_value(&meeting).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 8);
        assert_eq!(json["zoom_id"], "999");
        assert_eq!(json["duration"], 30);
    }
}
