//! Test server harness for E2E testing
//!
//! Provides `TestMeetingServer` for spawning a real meeting proxy router in
//! tests. Storage is in memory and both the OAuth endpoint and the meeting
//! provider are served by one `wiremock` server.

use common::token_manager::{TokenManager, TokenManagerConfig};
use meeting_proxy::config::Config;
use meeting_proxy::repositories::InMemoryMeetingRepository;
use meeting_proxy::routes::{self, AppState};
use meeting_proxy::services::{MeetingService, ZoomClient};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the stub OAuth token endpoint on the provider mock.
pub const OAUTH_PATH: &str = "/oauth/token";

/// Test harness for spawning the meeting proxy in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_root() -> anyhow::Result<()> {
///     let server = TestMeetingServer::spawn().await?;
///     let response = reqwest::get(server.url()).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestMeetingServer {
    addr: SocketAddr,
    provider: MockServer,
    repository: Arc<InMemoryMeetingRepository>,
    token_manager: Arc<TokenManager>,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestMeetingServer {
    /// Spawn a server with an empty in-memory repository.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_repository(Arc::new(InMemoryMeetingRepository::new())).await
    }

    /// Spawn a server backed by the given repository.
    ///
    /// The server will:
    /// - Start a fresh provider mock (no routes mounted)
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_repository(
        repository: Arc<InMemoryMeetingRepository>,
    ) -> Result<Self, anyhow::Error> {
        let provider = MockServer::start().await;

        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("ZOOM_API_URL".to_string(), provider.uri()),
            (
                "ZOOM_OAUTH_URL".to_string(),
                format!("{}{}", provider.uri(), OAUTH_PATH),
            ),
            ("ZOOM_CLIENT_ID".to_string(), "test-client".to_string()),
            ("ZOOM_CLIENT_SECRET".to_string(), "test-secret".to_string()),
            ("ZOOM_ACCOUNT_ID".to_string(), "test-account".to_string()),
            ("ZOOM_REQUEST_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("MP_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let token_manager = Arc::new(
            TokenManager::new(
                TokenManagerConfig::new(
                    config.zoom_oauth_url.clone(),
                    config.zoom_client_id.clone(),
                    config.zoom_account_id.clone(),
                    config.zoom_client_secret.clone(),
                )
                .with_http_timeout(config.zoom_request_timeout),
            )
            .map_err(|e| anyhow::anyhow!("Failed to create token manager: {}", e))?,
        );

        let zoom_client = ZoomClient::new(&config.zoom_api_url, config.zoom_request_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create provider client: {}", e))?;

        let meetings = MeetingService::new(repository.clone(), zoom_client, token_manager.clone());
        let state = Arc::new(AppState {
            config: config.clone(),
            meetings,
        });

        // Unregistered recorder: /metrics renders, nothing global is installed
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        // Build routes using the real route builder
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            provider,
            repository,
            token_manager,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The provider mock, for mounting custom responses.
    pub fn provider(&self) -> &MockServer {
        &self.provider
    }

    /// The in-memory repository behind the server.
    pub fn repository(&self) -> &Arc<InMemoryMeetingRepository> {
        &self.repository
    }

    /// The token manager behind the server.
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve `access_token` from the OAuth endpoint.
    pub async fn mount_token_endpoint(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path(OAUTH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access_token,
                "token_type": "bearer",
                "expires_in": 3599,
                "scope": "meeting:write:admin"
            })))
            .mount(&self.provider)
            .await;
    }

    /// Answer every create with 201 and the given provider id, echoing
    /// fixed meeting fields.
    pub async fn mount_create_meeting(&self, zoom_id: i64) {
        Mock::given(method("POST"))
            .and(path("/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": zoom_id,
                "topic": "Sprint Review",
                "agenda": "",
                "start_time": "2025-01-10T10:00:00Z",
                "duration": 30,
                "join_url": format!("https://zoom.us/j/{zoom_id}"),
                "start_url": format!("https://zoom.us/s/{zoom_id}")
            })))
            .mount(&self.provider)
            .await;
    }

    /// Answer every update and delete with the given status and body.
    pub async fn mount_meeting_mutations(&self, status: u16, body: &str) {
        Mock::given(path_regex(r"^/meetings/[^/]+$"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.provider)
            .await;
    }
}

impl Drop for TestMeetingServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released immediately
        self._handle.abort();
    }
}
