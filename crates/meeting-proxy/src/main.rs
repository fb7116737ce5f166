//! Meeting Proxy
//!
//! Entry point for the Zoom meeting backend.

use common::token_manager::{
    AcquisitionCallback, AcquisitionEvent, TokenManager, TokenManagerConfig,
};
use meeting_proxy::config::Config;
use meeting_proxy::observability::metrics::{init_metrics_recorder, record_token_acquisition};
use meeting_proxy::repositories::PgMeetingRepository;
use meeting_proxy::routes::{self, AppState};
use meeting_proxy::services::{MeetingService, ZoomClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Local development reads credentials from .env; absence is fine
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_proxy=debug,common=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Meeting Proxy");
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        zoom_api_url = %config.zoom_api_url,
        zoom_oauth_url = %config.zoom_oauth_url,
        request_timeout_secs = config.zoom_request_timeout.as_secs(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Initialize database connection pool with query timeout
    info!("Connecting to database...");
    let db_url_with_timeout = add_query_timeout(&config.database_url, 5);
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    // Token is acquired on the first provider call, not here
    let token_config = TokenManagerConfig::new(
        config.zoom_oauth_url.clone(),
        config.zoom_client_id.clone(),
        config.zoom_account_id.clone(),
        config.zoom_client_secret.clone(),
    )
    .with_http_timeout(config.zoom_request_timeout);

    let on_acquire: AcquisitionCallback = Arc::new(|event: AcquisitionEvent| {
        let status = if event.success { "success" } else { "error" };
        record_token_acquisition(status, event.error_type, event.duration);
    });
    let token_manager = TokenManager::new(token_config)
        .map_err(|e| {
            error!("Failed to build token manager: {}", e);
            e
        })?
        .with_acquisition_callback(on_acquire);

    let zoom_client = ZoomClient::new(&config.zoom_api_url, config.zoom_request_timeout)?;

    let meetings = MeetingService::new(
        Arc::new(PgMeetingRepository::new(db_pool)),
        zoom_client,
        Arc::new(token_manager),
    );

    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState { config, meetings });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Meeting Proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await?;

    info!("Meeting Proxy shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (MP_DRAIN_SECONDS=0)");
    }
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_timeout() {
        assert_eq!(
            add_query_timeout("postgres://localhost/zoom", 5),
            "postgres://localhost/zoom?options=-c%20statement_timeout%3D5s"
        );
        assert_eq!(
            add_query_timeout("postgres://localhost/zoom?sslmode=disable", 5),
            "postgres://localhost/zoom?sslmode=disable&options=-c%20statement_timeout%3D5s"
        );
    }
}
