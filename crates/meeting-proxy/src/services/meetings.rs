//! Meeting orchestration.
//!
//! Each mutating operation is a two-step sequence: one call to the provider,
//! then one write to local storage. Nothing is rolled back when the second
//! step fails; the outcome records the divergence so it can be reconciled by
//! hand.

use crate::errors::ProxyError;
use crate::models::{Meeting, MeetingInput};
use crate::observability::metrics;
use crate::repositories::MeetingRepository;
use crate::services::zoom_client::ZoomClient;
use common::secret::SecretString;
use common::token_manager::TokenManager;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Logged in place of the provider id when a created meeting's id could not
/// be read.
pub const UNKNOWN_ZOOM_ID: &str = "unknown";

/// Result of a provider mutation followed by a local write.
#[derive(Debug)]
pub enum SyncOutcome<T> {
    /// Both steps succeeded.
    Synced(T),

    /// The provider refused or was unreachable. Local storage is untouched.
    UpstreamFailed(ProxyError),

    /// The provider applied the change but it could not be mirrored locally,
    /// either because the local write failed or the provider's reply was
    /// unreadable.
    Diverged { zoom_id: String, error: ProxyError },
}

impl<T> SyncOutcome<T> {
    /// Collapse the outcome into a response result.
    ///
    /// A divergence is logged under `mp.reconcile` with both identifiers and
    /// reported as [`ProxyError::Reconciliation`].
    ///
    /// # Errors
    ///
    /// Returns the provider error or a reconciliation error.
    pub fn into_result(self, operation: &'static str, local_id: &str) -> Result<T, ProxyError> {
        match self {
            SyncOutcome::Synced(value) => Ok(value),
            SyncOutcome::UpstreamFailed(error) => Err(error),
            SyncOutcome::Diverged { zoom_id, error } => {
                error!(
                    target: "mp.reconcile",
                    operation = operation,
                    local_id = %local_id,
                    zoom_id = %zoom_id,
                    error = %error,
                    "Provider and local storage diverged; manual reconciliation required"
                );
                metrics::record_reconciliation_required(operation);

                Err(ProxyError::Reconciliation {
                    operation,
                    local_id: local_id.to_string(),
                    zoom_id,
                })
            }
        }
    }
}

/// Sequences token acquisition, provider calls and local storage.
#[derive(Clone)]
pub struct MeetingService {
    repository: Arc<dyn MeetingRepository>,
    zoom: ZoomClient,
    tokens: Arc<TokenManager>,
}

impl MeetingService {
    pub fn new(
        repository: Arc<dyn MeetingRepository>,
        zoom: ZoomClient,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            repository,
            zoom,
            tokens,
        }
    }

    /// Storage backing this service.
    pub fn repository(&self) -> &Arc<dyn MeetingRepository> {
        &self.repository
    }

    /// All locally mirrored meetings.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Database` if storage is unavailable.
    pub async fn list(&self) -> Result<Vec<Meeting>, ProxyError> {
        self.repository.list_all().await
    }

    /// One locally mirrored meeting.
    ///
    /// # Errors
    ///
    /// - `ProxyError::NotFound` if no meeting has this local id
    /// - `ProxyError::Database` if storage is unavailable
    pub async fn get(&self, local_id: &str) -> Result<Meeting, ProxyError> {
        self.repository
            .get_by_id(local_id)
            .await?
            .ok_or_else(|| ProxyError::NotFound("Meeting not found".to_string()))
    }

    /// Schedule a meeting at the provider and mirror it under `local_id`.
    ///
    /// # Errors
    ///
    /// Fails before contacting the provider on invalid input
    /// (`ProxyError::BadRequest`) or when no token can be obtained.
    #[instrument(skip_all, name = "mp.service.create_meeting", fields(local_id = %local_id))]
    pub async fn create(
        &self,
        local_id: &str,
        input: MeetingInput,
    ) -> Result<SyncOutcome<Meeting>, ProxyError> {
        let fields = input.validate().map_err(ProxyError::BadRequest)?;
        let token = self.token().await?;

        let created = match self.zoom.create_meeting(&token, &fields).await {
            Ok(created) => created,
            Err(error @ ProxyError::UnreadableCreate { .. }) => {
                let zoom_id = match &error {
                    ProxyError::UnreadableCreate {
                        zoom_id: Some(zoom_id),
                        ..
                    } => zoom_id.clone(),
                    _ => UNKNOWN_ZOOM_ID.to_string(),
                };
                return Ok(SyncOutcome::Diverged { zoom_id, error });
            }
            Err(e) => return Ok(SyncOutcome::UpstreamFailed(e)),
        };

        let meeting = Meeting {
            id: local_id.to_string(),
            zoom_id: created.id.to_string(),
            topic: created.topic.unwrap_or(fields.topic),
            agenda: created.agenda.unwrap_or(fields.agenda),
            start_time: created.start_time.unwrap_or(fields.start_time),
            duration: created.duration.unwrap_or(fields.duration),
            join_url: created.join_url,
            start_url: created.start_url,
        };

        if let Err(error) = self.repository.insert(&meeting).await {
            return Ok(SyncOutcome::Diverged {
                zoom_id: meeting.zoom_id,
                error,
            });
        }

        info!(
            target: "mp.services.meetings",
            local_id = %meeting.id,
            zoom_id = %meeting.zoom_id,
            "Meeting created"
        );

        Ok(SyncOutcome::Synced(meeting))
    }

    /// Apply new editable fields at the provider, then locally.
    ///
    /// # Errors
    ///
    /// Fails before contacting the provider when the meeting is unknown
    /// (`ProxyError::NotFound`), the input is invalid, or no token can be
    /// obtained.
    #[instrument(skip_all, name = "mp.service.update_meeting", fields(local_id = %local_id))]
    pub async fn update(
        &self,
        local_id: &str,
        input: MeetingInput,
    ) -> Result<SyncOutcome<()>, ProxyError> {
        let existing = self.get(local_id).await?;
        self.apply_update(existing, input).await
    }

    /// Update a meeting that has already been looked up.
    ///
    /// # Errors
    ///
    /// Fails before contacting the provider when the input is invalid or no
    /// token can be obtained.
    #[instrument(skip_all, name = "mp.service.apply_update", fields(local_id = %existing.id))]
    pub async fn apply_update(
        &self,
        existing: Meeting,
        input: MeetingInput,
    ) -> Result<SyncOutcome<()>, ProxyError> {
        let local_id = existing.id.as_str();
        let fields = input.validate().map_err(ProxyError::BadRequest)?;
        let token = self.token().await?;

        if let Err(e) = self
            .zoom
            .update_meeting(&token, &existing.zoom_id, &fields)
            .await
        {
            return Ok(SyncOutcome::UpstreamFailed(e));
        }

        match self
            .repository
            .update_by_remote_id(&existing.zoom_id, &fields)
            .await
        {
            Ok(0) => {
                warn!(
                    target: "mp.services.meetings",
                    local_id = %local_id,
                    zoom_id = %existing.zoom_id,
                    "Provider meeting updated but no local row matched"
                );
                Ok(SyncOutcome::Synced(()))
            }
            Ok(_) => {
                info!(target: "mp.services.meetings", local_id = %local_id, "Meeting updated");
                Ok(SyncOutcome::Synced(()))
            }
            Err(error) => Ok(SyncOutcome::Diverged {
                zoom_id: existing.zoom_id,
                error,
            }),
        }
    }

    /// Delete at the provider, then locally.
    ///
    /// # Errors
    ///
    /// Fails before contacting the provider when the meeting is unknown or no
    /// token can be obtained.
    #[instrument(skip_all, name = "mp.service.delete_meeting", fields(local_id = %local_id))]
    pub async fn delete(&self, local_id: &str) -> Result<SyncOutcome<()>, ProxyError> {
        let existing = self.get(local_id).await?;
        let token = self.token().await?;

        if let Err(e) = self.zoom.delete_meeting(&token, &existing.zoom_id).await {
            return Ok(SyncOutcome::UpstreamFailed(e));
        }

        if let Err(error) = self.repository.delete_by_local_id(local_id).await {
            return Ok(SyncOutcome::Diverged {
                zoom_id: existing.zoom_id,
                error,
            });
        }

        info!(target: "mp.services.meetings", local_id = %local_id, "Meeting deleted");
        Ok(SyncOutcome::Synced(()))
    }

    async fn token(&self) -> Result<SecretString, ProxyError> {
        self.tokens.access_token().await.map_err(|e| {
            warn!(
                target: "mp.services.meetings",
                error_type = e.error_type(),
                "Failed to obtain provider token"
            );
            ProxyError::from(e)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryMeetingRepository;
    use crate::services::zoom_client::DEFAULT_REQUEST_TIMEOUT;
    use common::token_manager::TokenManagerConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_config(oauth_url: &str) -> TokenManagerConfig {
        TokenManagerConfig::new(
            oauth_url.to_string(),
            "client".to_string(),
            "account".to_string(),
            SecretString::from("secret"),
        )
    }

    fn cached_tokens() -> Arc<TokenManager> {
        Arc::new(
            TokenManager::with_cached_token(
                token_config("http://127.0.0.1:1/oauth/token"),
                SecretString::from("bearer"),
            )
            .unwrap(),
        )
    }

    fn service(
        server: &MockServer,
        repository: Arc<InMemoryMeetingRepository>,
        tokens: Arc<TokenManager>,
    ) -> MeetingService {
        let zoom = ZoomClient::new(&server.uri(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        MeetingService::new(repository, zoom, tokens)
    }

    fn input(topic: &str) -> MeetingInput {
        MeetingInput {
            topic: Some(topic.to_string()),
            agenda: Some("Agenda".to_string()),
            start_time: Some("2025-01-10T10:00:00Z".to_string()),
            duration: Some(30),
        }
    }

    fn stored(id: &str, zoom_id: &str) -> Meeting {
        Meeting {
            id: id.to_string(),
            zoom_id: zoom_id.to_string(),
            topic: "Original".to_string(),
            agenda: String::new(),
            start_time: "2025-01-01T09:00:00Z".to_string(),
            duration: 15,
            join_url: "https://zoom.us/j/1".to_string(),
            start_url: "https://zoom.us/s/1".to_string(),
        }
    }

    async fn mount_create(server: &MockServer, zoom_id: i64) {
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": zoom_id,
                "topic": "Sprint Review",
                "agenda": "Agenda",
                "start_time": "2025-01-10T10:00:00Z",
                "duration": 30,
                "join_url": format!("https://zoom.us/j/{zoom_id}"),
                "start_url": format!("https://zoom.us/s/{zoom_id}")
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_create_synced_stores_provider_id() {
        let server = MockServer::start().await;
        mount_create(&server, 999).await;
        let repository = Arc::new(InMemoryMeetingRepository::new());
        let service = service(&server, repository.clone(), cached_tokens());

        let outcome = service.create("local-1", input("Sprint Review")).await.unwrap();
        let meeting = outcome.into_result("create", "local-1").unwrap();

        assert_eq!(meeting.id, "local-1");
        assert_eq!(meeting.zoom_id, "999");
        assert_eq!(
            repository.get_by_id("local-1").await.unwrap(),
            Some(meeting)
        );
    }

    #[tokio::test]
    async fn test_create_invalid_input_skips_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let repository = Arc::new(InMemoryMeetingRepository::new());
        let service = service(&server, repository.clone(), cached_tokens());

        let mut body = input("Demo");
        body.duration = Some(0);
        let result = service.create("local-1", body).await;

        assert!(matches!(result, Err(ProxyError::BadRequest(_))));
        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_upstream_failure_leaves_storage_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;
        let repository = Arc::new(InMemoryMeetingRepository::new());
        let service = service(&server, repository.clone(), cached_tokens());

        let outcome = service.create("local-1", input("Demo")).await.unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::UpstreamFailed(ProxyError::Upstream { status: 429, .. })
        ));
        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_diverged_when_insert_fails() {
        let server = MockServer::start().await;
        mount_create(&server, 4242).await;
        let repository = Arc::new(InMemoryMeetingRepository::failing_writes());
        let service = service(&server, repository, cached_tokens());

        let outcome = service.create("local-1", input("Demo")).await.unwrap();
        assert!(matches!(&outcome, SyncOutcome::Diverged { zoom_id, .. } if zoom_id == "4242"));

        let error = outcome.into_result("create", "local-1").unwrap_err();
        assert!(matches!(
            error,
            ProxyError::Reconciliation { operation: "create", ref local_id, ref zoom_id }
                if local_id == "local-1" && zoom_id == "4242"
        ));
    }

    #[tokio::test]
    async fn test_create_unreadable_reply_is_diverged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "join_url": "j",
                "start_url": "s"
            })))
            .mount(&server)
            .await;
        let repository = Arc::new(InMemoryMeetingRepository::new());
        let service = service(&server, repository.clone(), cached_tokens());

        let outcome = service.create("local-1", input("Demo")).await.unwrap();
        assert!(matches!(
            &outcome,
            SyncOutcome::Diverged { zoom_id, error: ProxyError::UnreadableCreate { .. } }
                if zoom_id == UNKNOWN_ZOOM_ID
        ));
        assert!(repository.is_empty().await);

        let error = outcome.into_result("create", "local-1").unwrap_err();
        assert!(matches!(
            error,
            ProxyError::Reconciliation { operation: "create", ref local_id, .. } if local_id == "local-1"
        ));
    }

    #[tokio::test]
    async fn test_create_unreadable_reply_keeps_salvaged_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 777 })),
            )
            .mount(&server)
            .await;
        let service = service(&server, Arc::new(InMemoryMeetingRepository::new()), cached_tokens());

        let outcome = service.create("local-1", input("Demo")).await.unwrap();
        assert!(matches!(&outcome, SyncOutcome::Diverged { zoom_id, .. } if zoom_id == "777"));
    }

    #[tokio::test]
    async fn test_create_token_failure_skips_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = Arc::new(
            TokenManager::new(token_config(&format!("{}/oauth/token", server.uri()))).unwrap(),
        );
        let service = service(&server, Arc::new(InMemoryMeetingRepository::new()), tokens);

        let result = service.create("local-1", input("Demo")).await;
        assert!(matches!(result, Err(ProxyError::TokenUnavailable(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let server = MockServer::start().await;
        let service = service(
            &server,
            Arc::new(InMemoryMeetingRepository::new()),
            cached_tokens(),
        );

        assert!(matches!(
            service.get("nope").await,
            Err(ProxyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found_before_validation() {
        let server = MockServer::start().await;
        let service = service(
            &server,
            Arc::new(InMemoryMeetingRepository::new()),
            cached_tokens(),
        );

        let result = service.update("nope", MeetingInput::default()).await;
        assert!(matches!(result, Err(ProxyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_synced_uses_stored_zoom_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/meetings/77"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let repository =
            Arc::new(InMemoryMeetingRepository::new().with_meetings(vec![stored("local-1", "77")]));
        let service = service(&server, repository.clone(), cached_tokens());

        service
            .update("local-1", input("Renamed"))
            .await
            .unwrap()
            .into_result("update", "local-1")
            .unwrap();

        let meeting = repository.get_by_id("local-1").await.unwrap().unwrap();
        assert_eq!(meeting.topic, "Renamed");
        assert_eq!(meeting.agenda, "Agenda");
        assert_eq!(meeting.duration, 30);
        assert_eq!(meeting.join_url, "https://zoom.us/j/1");
    }

    #[tokio::test]
    async fn test_update_rejected_leaves_storage_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/meetings/77"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad start_time"))
            .mount(&server)
            .await;
        let repository =
            Arc::new(InMemoryMeetingRepository::new().with_meetings(vec![stored("local-1", "77")]));
        let service = service(&server, repository.clone(), cached_tokens());

        let error = service
            .update("local-1", input("Renamed"))
            .await
            .unwrap()
            .into_result("update", "local-1")
            .unwrap_err();

        assert!(matches!(error, ProxyError::Upstream { status: 400, .. }));
        assert_eq!(
            repository.get_by_id("local-1").await.unwrap(),
            Some(stored("local-1", "77"))
        );
    }

    #[tokio::test]
    async fn test_update_diverged_when_local_write_fails() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/meetings/77"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let repository = Arc::new(
            InMemoryMeetingRepository::failing_writes().with_meetings(vec![stored("local-1", "77")]),
        );
        let service = service(&server, repository, cached_tokens());

        let outcome = service.update("local-1", input("Renamed")).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Diverged { .. }));
    }

    #[tokio::test]
    async fn test_delete_synced_removes_row() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/meetings/77"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let repository =
            Arc::new(InMemoryMeetingRepository::new().with_meetings(vec![stored("local-1", "77")]));
        let service = service(&server, repository.clone(), cached_tokens());

        service
            .delete("local-1")
            .await
            .unwrap()
            .into_result("delete", "local-1")
            .unwrap();

        assert!(matches!(
            service.get("local-1").await,
            Err(ProxyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_upstream_failure_keeps_row() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/meetings/77"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let repository =
            Arc::new(InMemoryMeetingRepository::new().with_meetings(vec![stored("local-1", "77")]));
        let service = service(&server, repository.clone(), cached_tokens());

        let outcome = service.delete("local-1").await.unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::UpstreamFailed(ProxyError::Upstream { status: 404, .. })
        ));
        assert_eq!(repository.len().await, 1);
    }

    #[test]
    fn test_into_result_synced_and_upstream() {
        assert_eq!(SyncOutcome::Synced(5).into_result("update", "x").unwrap(), 5);

        let outcome: SyncOutcome<()> =
            SyncOutcome::UpstreamFailed(ProxyError::BadGateway("down".to_string()));
        assert!(matches!(
            outcome.into_result("delete", "x"),
            Err(ProxyError::BadGateway(_))
        ));
    }
}
