use crate::error::CoreError;
use crate::models::{normalize_timestamp, EventEntry};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl super::EventRepository for SqliteRepository {
    async fn append_event(&self, occurred_at: DateTime<Utc>, message: &str) -> Result<EventEntry, CoreError> {
        let occurred_at = normalize_timestamp(occurred_at);
        let result = sqlx::query("INSERT INTO task_events (occurred_at, message) VALUES ($1, $2)")
            .bind(occurred_at)
            .bind(message)
            .execute(self.pool())
            .await?;

        Ok(EventEntry {
            id: result.last_insert_rowid(),
            occurred_at,
            message: message.to_string(),
        })
    }

    async fn list_events(&self) -> Result<Vec<EventEntry>, CoreError> {
        let events = sqlx::query_as("SELECT * FROM task_events ORDER BY occurred_at, id")
            .fetch_all(self.pool())
            .await?;
        Ok(events)
    }
}
