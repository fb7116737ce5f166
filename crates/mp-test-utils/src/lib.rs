//! # Meeting Proxy Test Utilities
//!
//! This crate provides:
//! - Server test harness (`TestMeetingServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mp_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestMeetingServer::spawn().await?;
//!     server.mount_token_endpoint("test-token").await;
//!     server.mount_create_meeting(999).await;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/meetings", server.url()))
//!         .json(&serde_json::json!({
//!             "topic": "Sprint Review",
//!             "start_time": "2025-01-10T10:00:00Z",
//!             "duration": 30
//!         }))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 201);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
