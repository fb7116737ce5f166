//! Meetings repository for database operations.
//!
//! Mirrors provider meetings in the `zoom_meetings` table.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Join and start URLs are never logged

use crate::errors::ProxyError;
use crate::models::{Meeting, MeetingFields};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Local storage for mirrored meetings.
///
/// Every method fails with [`ProxyError::Database`] when storage is
/// unreachable or rejects the statement.
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// All stored meetings, in no particular order.
    ///
    /// Rows that cannot be decoded are skipped with a warning.
    async fn list_all(&self) -> Result<Vec<Meeting>, ProxyError>;

    /// The meeting with the given local id, if any.
    async fn get_by_id(&self, local_id: &str) -> Result<Option<Meeting>, ProxyError>;

    /// Store a new meeting.
    async fn insert(&self, meeting: &Meeting) -> Result<(), ProxyError>;

    /// Overwrite the editable fields of the meeting with the given provider id.
    ///
    /// Returns the number of rows changed. Zero is not an error.
    async fn update_by_remote_id(
        &self,
        remote_id: &str,
        fields: &MeetingFields,
    ) -> Result<u64, ProxyError>;

    /// Remove the meeting with the given local id.
    ///
    /// Returns the number of rows removed. Zero is not an error.
    async fn delete_by_local_id(&self, local_id: &str) -> Result<u64, ProxyError>;

    /// Connectivity probe used by the readiness endpoint.
    async fn ping(&self) -> Result<(), ProxyError>;
}

/// PostgreSQL-backed [`MeetingRepository`].
#[derive(Clone)]
pub struct PgMeetingRepository {
    pool: PgPool,
}

impl PgMeetingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Record the query outcome and convert the error.
fn observe<T>(
    operation: &str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, ProxyError> {
    let duration = start.elapsed();
    match result {
        Ok(value) => {
            metrics::record_db_query(operation, "success", duration);
            Ok(value)
        }
        Err(e) => {
            metrics::record_db_query(operation, "error", duration);
            Err(ProxyError::Database(e.to_string()))
        }
    }
}

#[async_trait]
impl MeetingRepository for PgMeetingRepository {
    #[instrument(skip_all, name = "mp.repo.list_meetings")]
    async fn list_all(&self) -> Result<Vec<Meeting>, ProxyError> {
        let start = Instant::now();

        let rows = sqlx::query(
            r#"
            SELECT id, zoom_id, topic, agenda, start_time, duration, join_url, start_url
            FROM zoom_meetings
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        let rows = observe("list_meetings", start, rows)?;

        let total = rows.len();
        let meetings: Vec<Meeting> = rows
            .iter()
            .filter_map(|row| match map_row_to_meeting(row) {
                Ok(meeting) => Some(meeting),
                Err(e) => {
                    tracing::warn!(
                        target: "mp.repo.meetings",
                        error = %e,
                        "Skipping meeting row that failed to decode"
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            target: "mp.repo.meetings",
            total = total,
            returned = meetings.len(),
            "Listed meetings"
        );

        Ok(meetings)
    }

    #[instrument(skip_all, name = "mp.repo.get_meeting", fields(local_id = %local_id))]
    async fn get_by_id(&self, local_id: &str) -> Result<Option<Meeting>, ProxyError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT id, zoom_id, topic, agenda, start_time, duration, join_url, start_url
            FROM zoom_meetings
            WHERE id = $1
            "#,
        )
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await;
        let row = observe("get_meeting", start, row)?;

        row.as_ref()
            .map(map_row_to_meeting)
            .transpose()
            .map_err(ProxyError::from)
    }

    #[instrument(skip_all, name = "mp.repo.insert_meeting", fields(local_id = %meeting.id, zoom_id = %meeting.zoom_id))]
    async fn insert(&self, meeting: &Meeting) -> Result<(), ProxyError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            INSERT INTO zoom_meetings (
                id, zoom_id, topic, agenda, start_time, duration, join_url, start_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&meeting.id) // $1
        .bind(&meeting.zoom_id) // $2
        .bind(&meeting.topic) // $3
        .bind(&meeting.agenda) // $4
        .bind(&meeting.start_time) // $5
        .bind(meeting.duration) // $6
        .bind(&meeting.join_url) // $7
        .bind(&meeting.start_url) // $8
        .execute(&self.pool)
        .await;
        observe("insert_meeting", start, result)?;

        Ok(())
    }

    #[instrument(skip_all, name = "mp.repo.update_meeting", fields(zoom_id = %remote_id))]
    async fn update_by_remote_id(
        &self,
        remote_id: &str,
        fields: &MeetingFields,
    ) -> Result<u64, ProxyError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE zoom_meetings
            SET topic = $1, agenda = $2, start_time = $3, duration = $4, updated_at = NOW()
            WHERE zoom_id = $5
            "#,
        )
        .bind(&fields.topic)
        .bind(&fields.agenda)
        .bind(&fields.start_time)
        .bind(fields.duration)
        .bind(remote_id)
        .execute(&self.pool)
        .await;
        let result = observe("update_meeting", start, result)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, name = "mp.repo.delete_meeting", fields(local_id = %local_id))]
    async fn delete_by_local_id(&self, local_id: &str) -> Result<u64, ProxyError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM zoom_meetings WHERE id = $1")
            .bind(local_id)
            .execute(&self.pool)
            .await;
        let result = observe("delete_meeting", start, result)?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), ProxyError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        observe("ping", start, result)?;
        Ok(())
    }
}

/// Decode one `zoom_meetings` row.
fn map_row_to_meeting(row: &PgRow) -> Result<Meeting, sqlx::Error> {
    Ok(Meeting {
        id: row.try_get("id")?,
        zoom_id: row.try_get("zoom_id")?,
        topic: row.try_get("topic")?,
        agenda: row.try_get("agenda")?,
        start_time: row.try_get("start_time")?,
        duration: row.try_get("duration")?,
        join_url: row.try_get("join_url")?,
        start_url: row.try_get("start_url")?,
    })
}

/// In-memory repository for tests and local runs without PostgreSQL.
pub mod mock {

    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// [`MeetingRepository`] backed by a `HashMap` keyed on local id.
    #[derive(Default)]
    pub struct InMemoryMeetingRepository {
        meetings: RwLock<HashMap<String, Meeting>>,
        fail_writes: bool,
    }

    impl InMemoryMeetingRepository {
        /// Create an empty repository.
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a repository whose reads succeed but whose writes fail.
        pub fn failing_writes() -> Self {
            Self {
                meetings: RwLock::new(HashMap::new()),
                fail_writes: true,
            }
        }

        /// Seed the repository with existing meetings.
        pub fn with_meetings(self, meetings: Vec<Meeting>) -> Self {
            let map = meetings.into_iter().map(|m| (m.id.clone(), m)).collect();
            Self {
                meetings: RwLock::new(map),
                ..self
            }
        }

        /// Number of stored meetings.
        pub async fn len(&self) -> usize {
            self.meetings.read().await.len()
        }

        /// Whether nothing is stored.
        pub async fn is_empty(&self) -> bool {
            self.meetings.read().await.is_empty()
        }

        fn check_writable(&self) -> Result<(), ProxyError> {
            if self.fail_writes {
                return Err(ProxyError::Database(
                    "Mock repository write failure".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MeetingRepository for InMemoryMeetingRepository {
        async fn list_all(&self) -> Result<Vec<Meeting>, ProxyError> {
            Ok(self.meetings.read().await.values().cloned().collect())
        }

        async fn get_by_id(&self, local_id: &str) -> Result<Option<Meeting>, ProxyError> {
            Ok(self.meetings.read().await.get(local_id).cloned())
        }

        async fn insert(&self, meeting: &Meeting) -> Result<(), ProxyError> {
            self.check_writable()?;

            let mut meetings = self.meetings.write().await;
            if meetings.contains_key(&meeting.id) {
                return Err(ProxyError::Database(format!(
                    "duplicate key value violates unique constraint: id={}",
                    meeting.id
                )));
            }
            meetings.insert(meeting.id.clone(), meeting.clone());
            Ok(())
        }

        async fn update_by_remote_id(
            &self,
            remote_id: &str,
            fields: &MeetingFields,
        ) -> Result<u64, ProxyError> {
            self.check_writable()?;

            let mut updated = 0;
            for meeting in self
                .meetings
                .write()
                .await
                .values_mut()
                .filter(|m| m.zoom_id == remote_id)
            {
                meeting.topic.clone_from(&fields.topic);
                meeting.agenda.clone_from(&fields.agenda);
                meeting.start_time.clone_from(&fields.start_time);
                meeting.duration = fields.duration;
                updated += 1;
            }
            Ok(updated)
        }

        async fn delete_by_local_id(&self, local_id: &str) -> Result<u64, ProxyError> {
            self.check_writable()?;

            let removed = self.meetings.write().await.remove(local_id);
            Ok(u64::from(removed.is_some()))
        }

        async fn ping(&self) -> Result<(), ProxyError> {
            Ok(())
        }
    }
}
