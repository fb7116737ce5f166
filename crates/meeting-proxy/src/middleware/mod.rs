//! HTTP middleware for the meeting proxy.
//!
//! # Components
//!
//! - `http_metrics` - Request count and latency for every response

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
