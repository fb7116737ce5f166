//! OAuth 2.0 account-credentials token manager.
//!
//! Acquires a bearer token for the meeting provider's API and caches it for
//! the lifetime of the process.
//!
//! # Behavior
//!
//! - The first call to [`TokenManager::access_token`] exchanges the client
//!   credentials for a token; every later call returns the cached value
//!   without touching the network.
//! - The cached token carries no expiry and is never invalidated.
//! - Concurrent first callers are funneled through a single-flight gate, so
//!   a fresh process issues exactly one acquisition request.
//! - Failures are returned to the caller and nothing is cached, so the next
//!   request tries again. There is no retry loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::secret::{ExposeSecret, SecretString};
//! use common::token_manager::{TokenManager, TokenManagerConfig};
//!
//! let config = TokenManagerConfig::new(
//!     "https://zoom.us/oauth/token".to_string(),
//!     "client-id".to_string(),
//!     "account-id".to_string(),
//!     SecretString::from("client-secret"),
//! );
//! let manager = TokenManager::new(config)?;
//!
//! let token = manager.access_token().await?;
//! let header = format!("Bearer {}", token.expose_secret());
//! ```
//!
//! # Security
//!
//! - Client secret and token are stored as `SecretString` (never logged)
//! - Acquisition events are logged without values
//! - HTTP timeouts prevent hanging connections

use crate::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Grant type for server-to-server apps.
const GRANT_TYPE: &str = "account_credentials";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token acquisition.
#[derive(Error, Debug, Clone)]
pub enum TokenError {
    /// HTTP transport failure or unexpected status.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// Credentials rejected by the OAuth endpoint (401, 400).
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// Token response could not be decoded or lacked an access token.
    #[error("Malformed token response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TokenError {
    /// Bounded label describing the error category (for metrics).
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            TokenError::HttpError(_) => "http",
            TokenError::AuthenticationRejected(_) => "auth_rejected",
            TokenError::InvalidResponse(_) => "invalid_response",
            TokenError::Configuration(_) => "configuration",
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the token manager.
#[derive(Clone)]
pub struct TokenManagerConfig {
    /// OAuth token endpoint (e.g., `https://zoom.us/oauth/token`).
    pub oauth_url: String,

    /// OAuth client ID.
    pub client_id: String,

    /// Service account the token is issued for.
    pub account_id: String,

    /// OAuth client secret (as `SecretString`).
    pub client_secret: SecretString,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl std::fmt::Debug for TokenManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManagerConfig")
            .field("oauth_url", &self.oauth_url)
            .field("client_id", &self.client_id)
            .field("account_id", &self.account_id)
            .field("client_secret", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl TokenManagerConfig {
    /// Create a new configuration with the default timeout.
    ///
    /// # Security Warning
    ///
    /// Credentials travel in the `Authorization` header. Use
    /// [`TokenManagerConfig::new_secure`] to enforce HTTPS.
    #[must_use]
    pub fn new(
        oauth_url: String,
        client_id: String,
        account_id: String,
        client_secret: SecretString,
    ) -> Self {
        Self {
            oauth_url,
            client_id,
            account_id,
            client_secret,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Create a new configuration requiring HTTPS.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the URL doesn't use HTTPS.
    pub fn new_secure(
        oauth_url: String,
        client_id: String,
        account_id: String,
        client_secret: SecretString,
    ) -> Result<Self, TokenError> {
        if !oauth_url.starts_with("https://") {
            return Err(TokenError::Configuration(
                "OAuth endpoint must use HTTPS".into(),
            ));
        }
        Ok(Self::new(oauth_url, client_id, account_id, client_secret))
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

// =============================================================================
// Acquisition callback
// =============================================================================

/// Outcome of one acquisition attempt, reported to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionEvent {
    /// Whether a token was obtained.
    pub success: bool,
    /// Error category when `success` is false.
    pub error_type: Option<&'static str>,
    /// Time spent on the HTTP exchange.
    pub duration: Duration,
}

/// Callback invoked after every network acquisition attempt.
///
/// Lets the service record metrics without this crate depending on a
/// metrics backend.
pub type AcquisitionCallback = Arc<dyn Fn(AcquisitionEvent) + Send + Sync>;

// =============================================================================
// OAuth Response Types
// =============================================================================

/// OAuth 2.0 token response.
///
/// `access_token` is optional here so that a response missing it is
/// reported as [`TokenError::InvalidResponse`] with a clear message.
#[derive(Deserialize)]
struct OAuthTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl std::fmt::Debug for OAuthTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// =============================================================================
// Token Manager
// =============================================================================

/// Process-wide bearer token cache.
///
/// Constructed once at startup and shared through application state.
pub struct TokenManager {
    config: TokenManagerConfig,
    http_client: reqwest::Client,
    cached: RwLock<Option<SecretString>>,
    acquire_gate: Mutex<()>,
    acquisitions: AtomicU64,
    on_acquire: Option<AcquisitionCallback>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.config)
            .field("token", &"[REDACTED]")
            .field("acquisitions", &self.acquisition_count())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: TokenManagerConfig) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TokenError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
            cached: RwLock::new(None),
            acquire_gate: Mutex::new(()),
            acquisitions: AtomicU64::new(0),
            on_acquire: None,
        })
    }

    /// Register a callback fired after each network acquisition attempt.
    #[must_use]
    pub fn with_acquisition_callback(mut self, callback: AcquisitionCallback) -> Self {
        self.on_acquire = Some(callback);
        self
    }

    /// Create a manager whose cache is already populated.
    ///
    /// **Note**: This is only for testing. No acquisition request is ever made
    /// unless the cached token is empty.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_cached_token(
        config: TokenManagerConfig,
        token: SecretString,
    ) -> Result<Self, TokenError> {
        let manager = Self::new(config)?;
        Ok(Self {
            cached: RwLock::new(Some(token)),
            ..manager
        })
    }

    /// Return the cached token, acquiring one first if the cache is empty.
    ///
    /// # Errors
    ///
    /// - `TokenError::HttpError` - transport failure or unexpected status
    /// - `TokenError::AuthenticationRejected` - credentials rejected
    /// - `TokenError::InvalidResponse` - response lacked a usable `access_token`
    #[instrument(skip_all, name = "common.token_manager.access_token")]
    pub async fn access_token(&self) -> Result<SecretString, TokenError> {
        if let Some(token) = self.cached_token().await {
            trace!(target: "common.token_manager", "Using cached access token");
            return Ok(token);
        }

        let _gate = self.acquire_gate.lock().await;

        // Another caller may have filled the cache while we waited
        if let Some(token) = self.cached_token().await {
            trace!(target: "common.token_manager", "Access token acquired by concurrent caller");
            return Ok(token);
        }

        let start = Instant::now();
        let result = acquire_token(&self.config, &self.http_client).await;
        let duration = start.elapsed();

        if let Some(callback) = &self.on_acquire {
            callback(AcquisitionEvent {
                success: result.is_ok(),
                error_type: result.as_ref().err().map(TokenError::error_type),
                duration,
            });
        }

        match result {
            Ok(token) => {
                *self.cached.write().await = Some(token.clone());
                self.acquisitions.fetch_add(1, Ordering::SeqCst);
                info!(
                    target: "common.token_manager",
                    client_id = %self.config.client_id,
                    "Access token acquired and cached"
                );
                Ok(token)
            }
            Err(e) => {
                warn!(
                    target: "common.token_manager",
                    client_id = %self.config.client_id,
                    error = %e,
                    "Access token acquisition failed"
                );
                Err(e)
            }
        }
    }

    /// Number of successful network acquisitions made by this manager.
    #[must_use]
    pub fn acquisition_count(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    async fn cached_token(&self) -> Option<SecretString> {
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|token| !token.expose_secret().is_empty())
            .cloned()
    }
}

/// Exchange client credentials for a new token.
#[instrument(skip_all)]
async fn acquire_token(
    config: &TokenManagerConfig,
    http_client: &reqwest::Client,
) -> Result<SecretString, TokenError> {
    debug!(
        target: "common.token_manager",
        client_id = %config.client_id,
        url = %config.oauth_url,
        "Requesting access token"
    );

    let response = http_client
        .post(&config.oauth_url)
        .query(&[
            ("grant_type", GRANT_TYPE),
            ("account_id", config.account_id.as_str()),
        ])
        .basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
        .send()
        .await
        .map_err(|e| {
            debug!(target: "common.token_manager", error = %e, "HTTP request failed");
            TokenError::HttpError(e.to_string())
        })?;

    let status = response.status();

    if status.is_success() {
        let token_response: OAuthTokenResponse = response.json().await.map_err(|e| {
            warn!(target: "common.token_manager", error = %e, "Failed to parse token response");
            TokenError::InvalidResponse(e.to_string())
        })?;

        match token_response.access_token {
            Some(token) if !token.is_empty() => {
                debug!(
                    target: "common.token_manager",
                    token_type = ?token_response.token_type,
                    expires_in_secs = ?token_response.expires_in,
                    "Token response accepted"
                );
                Ok(SecretString::from(token))
            }
            Some(_) => Err(TokenError::InvalidResponse(
                "access_token is empty".to_string(),
            )),
            None => Err(TokenError::InvalidResponse(
                "access_token is missing".to_string(),
            )),
        }
    } else if status.as_u16() == 401 || status.as_u16() == 400 {
        // Body may echo credentials, keep it at trace level
        let body = response.text().await.unwrap_or_else(|e| {
            trace!(target: "common.token_manager", error = %e, "Failed to read error response body");
            "<failed to read body>".to_string()
        });
        warn!(
            target: "common.token_manager",
            status = %status,
            "Authentication rejected by OAuth endpoint"
        );
        trace!(
            target: "common.token_manager",
            body = %body,
            "Authentication rejection response body"
        );
        Err(TokenError::AuthenticationRejected(format!("Status {status}")))
    } else if status.is_server_error() {
        warn!(
            target: "common.token_manager",
            status = %status,
            "OAuth endpoint returned server error"
        );
        Err(TokenError::HttpError(format!("OAuth server error: {status}")))
    } else {
        warn!(
            target: "common.token_manager",
            status = %status,
            "Unexpected response from OAuth endpoint"
        );
        Err(TokenError::HttpError(format!("Unexpected status: {status}")))
    }
}

// =============================================================================
// Tests
// =============================================================================
