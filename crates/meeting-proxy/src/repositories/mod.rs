//! Repository layer for the meeting proxy.
//!
//! Provides database access following the Handler -> Service -> Repository
//! architecture.

pub mod meetings;

pub use meetings::mock::InMemoryMeetingRepository;
pub use meetings::{MeetingRepository, PgMeetingRepository};
