use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::db::DbPool;
use crate::models::normalize_timestamp;

use super::{FiredTrigger, JobBackend, JobDetail, JobKey, SchedulerError, Trigger, TriggerKey};

/// Job backend persisted in the `scheduler_jobs` / `scheduler_triggers` tables.
///
/// Registrations survive a process restart; the dispatcher of the next process
/// picks them up from the same database file.
#[derive(Debug, Clone)]
pub struct SqliteJobBackend {
    pool: DbPool,
}

#[derive(Debug, FromRow)]
struct TriggerRow {
    trigger_key: String,
    job_key: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl TriggerRow {
    fn into_trigger(self) -> Trigger {
        Trigger {
            key: TriggerKey(self.trigger_key),
            job_key: JobKey(self.job_key),
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

impl SqliteJobBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn job_exists_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        key: &JobKey,
    ) -> Result<bool, SchedulerError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM scheduler_jobs WHERE job_key = $1")
            .bind(key.as_str())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(found.is_some())
    }

    async fn delete_job_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        key: &JobKey,
    ) -> Result<bool, SchedulerError> {
        sqlx::query("DELETE FROM scheduler_triggers WHERE job_key = $1")
            .bind(key.as_str())
            .execute(&mut **tx)
            .await?;
        let result = sqlx::query("DELETE FROM scheduler_jobs WHERE job_key = $1")
            .bind(key.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl JobBackend for SqliteJobBackend {
    async fn job_exists(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM scheduler_jobs WHERE job_key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn trigger_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM scheduler_triggers WHERE trigger_key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn schedule(&self, job: &JobDetail, trigger: &Trigger) -> Result<(), SchedulerError> {
        let mut tx = self.pool.begin().await?;

        if Self::job_exists_in_transaction(&mut tx, &job.key).await? {
            return Err(SchedulerError::AlreadyExists(job.key.clone()));
        }

        let now = normalize_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO scheduler_jobs (job_key, occurrence_id, payload, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(job.key.as_str())
        .bind(job.occurrence_id)
        .bind(serde_json::to_string(job)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO scheduler_triggers (trigger_key, job_key, start_at, end_at, created_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(trigger.key.as_str())
        .bind(trigger.job_key.as_str())
        .bind(normalize_timestamp(trigger.start_at))
        .bind(normalize_timestamp(trigger.end_at))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        let mut tx = self.pool.begin().await?;
        let existed = Self::delete_job_in_transaction(&mut tx, key).await?;
        tx.commit().await?;
        Ok(existed)
    }

    async fn reschedule(&self, key: &TriggerKey, trigger: &Trigger) -> Result<bool, SchedulerError> {
        let mut tx = self.pool.begin().await?;

        if !Self::job_exists_in_transaction(&mut tx, &trigger.job_key).await? {
            return Ok(false);
        }

        sqlx::query("DELETE FROM scheduler_triggers WHERE trigger_key = $1")
            .bind(key.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO scheduler_triggers (trigger_key, job_key, start_at, end_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(trigger_key) DO UPDATE SET
                job_key = excluded.job_key,
                start_at = excluded.start_at,
                end_at = excluded.end_at"#,
        )
        .bind(trigger.key.as_str())
        .bind(trigger.job_key.as_str())
        .bind(normalize_timestamp(trigger.start_at))
        .bind(normalize_timestamp(trigger.end_at))
        .bind(normalize_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn acquire_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<FiredTrigger>, SchedulerError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let rows: Vec<TriggerRow> = sqlx::query_as(
            r#"SELECT trigger_key, job_key, start_at, end_at FROM scheduler_triggers
            WHERE start_at <= $1
            ORDER BY start_at, trigger_key
            LIMIT $2"#,
        )
        .bind(normalize_timestamp(now))
        .bind(limit as i64)
        .fetch_all(&mut *tx)
        .await?;

        let mut fired = Vec::with_capacity(rows.len());
        for row in rows {
            let trigger = row.into_trigger();
            let payload: Option<String> = sqlx::query_scalar("SELECT payload FROM scheduler_jobs WHERE job_key = $1")
                .bind(trigger.job_key.as_str())
                .fetch_optional(&mut *tx)
                .await?;

            Self::delete_job_in_transaction(&mut tx, &trigger.job_key).await?;

            match payload {
                Some(payload) => {
                    let job: JobDetail = serde_json::from_str(&payload)?;
                    fired.push(FiredTrigger { job, trigger });
                }
                None => {
                    sqlx::query("DELETE FROM scheduler_triggers WHERE trigger_key = $1")
                        .bind(trigger.key.as_str())
                        .execute(&mut *tx)
                        .await?;
                    tracing::warn!(trigger = %trigger.key, "dropping trigger without a job");
                }
            }
        }

        tx.commit().await?;
        Ok(fired)
    }

    async fn next_fire_time(&self) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        let next: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT start_at FROM scheduler_triggers ORDER BY start_at LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(next)
    }
}
