use crate::error::CoreError;
use crate::models::Task;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn save_task(&self, task: &Task) -> Result<Task, CoreError> {
        sqlx::query(
            r#"INSERT INTO tasks (id, name, start_time, end_time, duration_minutes, repeat_every_days, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration_minutes = excluded.duration_minutes,
                repeat_every_days = excluded.repeat_every_days"#,
        )
        .bind(task.id)
        .bind(&task.name)
        .bind(task.start_time)
        .bind(task.end_time)
        .bind(task.duration_minutes)
        .bind(task.repeat_every_days)
        .bind(task.created_at)
        .execute(self.pool())
        .await?;

        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::delete_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_task_cascade(&self, id: Uuid) -> Result<u64, CoreError> {
        let mut tx = self.pool().begin().await?;
        let removed = Self::delete_occurrences_by_task_in_transaction(&mut tx, id).await?;
        Self::delete_task_in_transaction(&mut tx, id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }
}

impl SqliteRepository {
    pub(crate) async fn delete_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        id: Uuid,
    ) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Task with id {} not found", id)));
        }
        Ok(())
    }
}
