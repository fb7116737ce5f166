//! Service layer for the meeting proxy.
//!
//! # Components
//!
//! - `meetings` - Two-step orchestration of provider calls and local writes
//! - `zoom_client` - HTTP client for the meeting provider API

pub mod meetings;
pub mod zoom_client;

pub use meetings::{MeetingService, SyncOutcome};
pub use zoom_client::ZoomClient;
