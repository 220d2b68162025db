use crate::error::CoreError;
use crate::models::Occurrence;
use crate::repository::{ensure_ordered, SqliteRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    async fn save_occurrence(&self, occurrence: &Occurrence) -> Result<Occurrence, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::upsert_occurrence_in_transaction(&mut tx, occurrence).await?;
        tx.commit().await?;
        Ok(occurrence.clone())
    }

    async fn save_occurrences(&self, occurrences: &[Occurrence]) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        for occurrence in occurrences {
            Self::upsert_occurrence_in_transaction(&mut tx, occurrence).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let occurrence = sqlx::query_as("SELECT * FROM task_occurrences WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(occurrence)
    }

    async fn find_occurrences_by_task(&self, task_id: Uuid) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            "SELECT * FROM task_occurrences WHERE task_id = $1 ORDER BY start_time",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Occurrence>, CoreError> {
        // Ids are stored as 16-byte blobs; match against their hex form
        let mut pattern: String = short_id
            .chars()
            .filter(|c| *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        pattern.push('%');

        let occurrences = sqlx::query_as(
            "SELECT * FROM task_occurrences WHERE lower(hex(id)) LIKE $1 ORDER BY start_time",
        )
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_overlapping(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            r#"SELECT * FROM task_occurrences
            WHERE start_time < $1 AND end_time > $2
            ORDER BY start_time"#,
        )
        .bind(end)
        .bind(start)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_overlapping_excluding(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude: Uuid) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            r#"SELECT * FROM task_occurrences
            WHERE start_time < $1 AND end_time > $2 AND id != $3
            ORDER BY start_time"#,
        )
        .bind(end)
        .bind(start)
        .bind(exclude)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_after(&self, time: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            "SELECT * FROM task_occurrences WHERE start_time > $1 ORDER BY start_time",
        )
        .bind(time)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        ensure_ordered(start, end)?;

        let occurrences = sqlx::query_as(
            r#"SELECT * FROM task_occurrences
            WHERE start_time BETWEEN $1 AND $2
            ORDER BY start_time"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }
}

impl SqliteRepository {
    pub(crate) async fn delete_occurrences_by_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
    ) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM task_occurrences WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn upsert_occurrence_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        occurrence: &Occurrence,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO task_occurrences (id, task_id, name, start_time, end_time, duration_minutes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration_minutes = excluded.duration_minutes,
                updated_at = excluded.updated_at"#,
        )
        .bind(occurrence.id)
        .bind(occurrence.task_id)
        .bind(&occurrence.name)
        .bind(occurrence.start_time)
        .bind(occurrence.end_time)
        .bind(occurrence.duration_minutes)
        .bind(occurrence.created_at)
        .bind(occurrence.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
