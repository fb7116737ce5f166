//! HTTP routes for the meeting proxy.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::MeetingService;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Whole-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long browsers may cache a preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Meeting orchestration (token, provider, storage).
    pub meetings: MeetingService,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Liveness message
/// - `/ready` - Readiness probe (storage ping)
/// - `/metrics` - Prometheus scrape endpoint
/// - `/meetings`, `/meetings/:id` - Meeting CRUD
/// - CORS for the configured browser origin
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics for every response
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origin);

    let api_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/meetings",
            get(handlers::list_meetings).post(handlers::create_meeting),
        )
        .route(
            "/meetings/:id",
            get(handlers::get_meeting)
                .put(handlers::update_meeting)
                .delete(handlers::delete_meeting),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. http_metrics_middleware - Records every response (outermost)
    // 2. TimeoutLayer
    // 3. TraceLayer
    // 4. CorsLayer - Answers preflights before routing
    api_routes
        .merge(metrics_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// CORS policy for the browser client.
///
/// Only a request from the configured origin is answered with
/// `Access-Control-Allow-Origin`. An origin that is not a valid header value
/// allows no cross-origin requests.
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(AllowOrigin::list([value])),
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "Invalid CORS origin; cross-origin requests disabled");
            layer
        }
    }
}
