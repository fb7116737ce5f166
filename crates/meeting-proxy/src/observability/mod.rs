//! Observability for the meeting proxy.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
