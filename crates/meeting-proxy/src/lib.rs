//! Meeting Proxy Library
//!
//! A backend that manages video meetings through the Zoom REST API and
//! keeps a local mirror of meeting metadata in PostgreSQL.
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//!                                        |
//!                                        +-> services/zoom_client.rs
//!                                        +-> common::token_manager
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Meeting records, validation and response bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - Meeting storage (PostgreSQL and in-memory)
//! - `routes` - Axum router setup
//! - `services` - Provider client and meeting orchestration

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
