//! HTTP request handlers for the meeting proxy.

pub mod health;
pub mod meetings;
pub mod metrics;

pub use health::{readiness_check, root};
pub use meetings::{create_meeting, delete_meeting, get_meeting, list_meetings, update_meeting};
pub use metrics::metrics_handler;
