//! Common utilities shared across the meeting proxy crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for OAuth bearer token acquisition and caching
pub mod token_manager;
