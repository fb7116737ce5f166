//! Meeting proxy configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default provider REST API base URL.
pub const DEFAULT_ZOOM_API_URL: &str = "https://api.zoom.us/v2";

/// Default provider OAuth token endpoint.
pub const DEFAULT_ZOOM_OAUTH_URL: &str = "https://zoom.us/oauth/token";

/// Default timeout for provider API calls in seconds.
pub const DEFAULT_ZOOM_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default origin allowed by CORS (the web client in development).
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 5;

/// Meeting proxy configuration.
///
/// Database URL and client secret are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Provider REST API base URL, without trailing slash.
    pub zoom_api_url: String,

    /// Provider OAuth token endpoint.
    pub zoom_oauth_url: String,

    /// OAuth client ID.
    pub zoom_client_id: String,

    /// OAuth client secret.
    pub zoom_client_secret: SecretString,

    /// Service account the bearer token is issued for.
    pub zoom_account_id: String,

    /// Timeout applied to every provider call.
    pub zoom_request_timeout: Duration,

    /// Maximum connections in the database pool.
    pub db_max_connections: u32,

    /// Origin allowed to call the API from a browser.
    pub cors_allowed_origin: String,

    /// Seconds to wait for in-flight requests on shutdown.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("zoom_api_url", &self.zoom_api_url)
            .field("zoom_oauth_url", &self.zoom_oauth_url)
            .field("zoom_client_id", &self.zoom_client_id)
            .field("zoom_client_secret", &"[REDACTED]")
            .field("zoom_account_id", &self.zoom_account_id)
            .field("zoom_request_timeout", &self.zoom_request_timeout)
            .field("db_max_connections", &self.db_max_connections)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid database pool configuration: {0}")]
    InvalidPoolSize(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;
        let zoom_client_id = required(vars, "ZOOM_CLIENT_ID")?;
        let zoom_client_secret = SecretString::from(required(vars, "ZOOM_CLIENT_SECRET")?);
        let zoom_account_id = required(vars, "ZOOM_ACCOUNT_ID")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let zoom_api_url = vars
            .get("ZOOM_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ZOOM_API_URL.to_string());

        let zoom_oauth_url = vars
            .get("ZOOM_OAUTH_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ZOOM_OAUTH_URL.to_string());

        let timeout_secs = if let Some(value_str) = vars.get("ZOOM_REQUEST_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRequestTimeout(format!(
                    "ZOOM_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRequestTimeout(
                    "ZOOM_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_ZOOM_REQUEST_TIMEOUT_SECONDS
        };

        let db_max_connections = if let Some(value_str) = vars.get("DB_MAX_CONNECTIONS") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidPoolSize(format!(
                    "DB_MAX_CONNECTIONS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidPoolSize(
                    "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_DB_MAX_CONNECTIONS
        };

        let cors_allowed_origin = vars
            .get("CORS_ALLOWED_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string());

        let drain_seconds = match vars.get("MP_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "MP_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            database_url,
            bind_address,
            zoom_api_url,
            zoom_oauth_url,
            zoom_client_id,
            zoom_client_secret,
            zoom_account_id,
            zoom_request_timeout: Duration::from_secs(timeout_secs),
            db_max_connections,
            cors_allowed_origin,
            drain_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    vars.get(key)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/meetings_test".to_string(),
            ),
            ("ZOOM_CLIENT_ID".to_string(), "client-abc".to_string()),
            ("ZOOM_CLIENT_SECRET".to_string(), "secret-xyz".to_string()),
            ("ZOOM_ACCOUNT_ID".to_string(), "account-123".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.database_url, "postgresql://localhost/meetings_test");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.zoom_api_url, DEFAULT_ZOOM_API_URL);
        assert_eq!(config.zoom_oauth_url, DEFAULT_ZOOM_OAUTH_URL);
        assert_eq!(config.zoom_client_id, "client-abc");
        assert_eq!(config.zoom_client_secret.expose_secret(), "secret-xyz");
        assert_eq!(config.zoom_account_id, "account-123");
        assert_eq!(
            config.zoom_request_timeout,
            Duration::from_secs(DEFAULT_ZOOM_REQUEST_TIMEOUT_SECONDS)
        );
        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.cors_allowed_origin, DEFAULT_CORS_ALLOWED_ORIGIN);
        assert_eq!(config.drain_seconds, DEFAULT_DRAIN_SECONDS);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "ZOOM_API_URL".to_string(),
            "http://localhost:4000/v2/".to_string(),
        );
        vars.insert(
            "ZOOM_OAUTH_URL".to_string(),
            "http://localhost:4000/oauth/token".to_string(),
        );
        vars.insert("ZOOM_REQUEST_TIMEOUT_SECONDS".to_string(), "3".to_string());
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "25".to_string());
        vars.insert(
            "CORS_ALLOWED_ORIGIN".to_string(),
            "https://app.example.com".to_string(),
        );
        vars.insert("MP_DRAIN_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        // Trailing slash is trimmed so paths can be appended
        assert_eq!(config.zoom_api_url, "http://localhost:4000/v2");
        assert_eq!(config.zoom_oauth_url, "http://localhost:4000/oauth/token");
        assert_eq!(config.zoom_request_timeout, Duration::from_secs(3));
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.cors_allowed_origin, "https://app.example.com");
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_from_vars_missing_database_url() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_from_vars_missing_credentials() {
        for key in ["ZOOM_CLIENT_ID", "ZOOM_CLIENT_SECRET", "ZOOM_ACCOUNT_ID"] {
            let mut vars = base_vars();
            vars.remove(key);

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == key),
                "expected missing {key}"
            );
        }
    }

    #[test]
    fn test_from_vars_blank_value_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("ZOOM_ACCOUNT_ID".to_string(), "   ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "ZOOM_ACCOUNT_ID"));
    }

    #[test]
    fn test_request_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("ZOOM_REQUEST_TIMEOUT_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRequestTimeout(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_request_timeout_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "ZOOM_REQUEST_TIMEOUT_SECONDS".to_string(),
            "ten".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRequestTimeout(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_pool_size_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidPoolSize(_))));
    }

    #[test]
    fn test_drain_period_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("MP_DRAIN_SECONDS".to_string(), "-1".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidDrainPeriod(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("postgresql://"));
        assert!(!debug_output.contains("secret-xyz"));
        assert!(debug_output.contains("client-abc"));
    }
}
