//! HTTP metrics middleware.
//!
//! Captures metrics for every response, including those produced before a
//! handler runs (JSON rejections, unknown routes, wrong methods, timeouts).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized path, status code and duration for a request.
///
/// Applied as the outermost layer so framework-level errors are counted.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
