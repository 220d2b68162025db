use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{EventEntry, Occurrence, Task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Re-export domain modules
pub mod events;
pub mod occurrences;
pub mod tasks;

/// Domain-specific trait for task (recurrence definition) storage
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts the task, or overwrites the stored row with the same id.
    async fn save_task(&self, task: &Task) -> Result<Task, CoreError>;
    /// Deletes the task row only. Occurrences must be removed first.
    async fn delete_task(&self, id: Uuid) -> Result<(), CoreError>;
    /// Deletes the task and its occurrences in one transaction, returning the
    /// number of occurrences removed.
    async fn delete_task_cascade(&self, id: Uuid) -> Result<u64, CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
}

/// Domain-specific trait for occurrence storage and time-range queries
#[async_trait]
pub trait OccurrenceRepository: Send + Sync {
    /// Inserts the occurrence, or overwrites the stored row with the same id.
    async fn save_occurrence(&self, occurrence: &Occurrence) -> Result<Occurrence, CoreError>;
    /// Inserts a whole batch in one transaction: all rows or none.
    async fn save_occurrences(&self, occurrences: &[Occurrence]) -> Result<(), CoreError>;
    async fn find_occurrence_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError>;
    async fn find_occurrences_by_task(&self, task_id: Uuid) -> Result<Vec<Occurrence>, CoreError>;
    async fn find_occurrences_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Occurrence>, CoreError>;
    /// Occurrences whose `[start, end)` intersects the given half-open interval.
    async fn find_occurrences_overlapping(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError>;
    /// Same as [`find_occurrences_overlapping`](Self::find_occurrences_overlapping), ignoring one occurrence.
    async fn find_occurrences_overlapping_excluding(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude: Uuid) -> Result<Vec<Occurrence>, CoreError>;
    /// Occurrences starting strictly after `time`, ordered by start.
    async fn find_occurrences_after(&self, time: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError>;
    /// Occurrences starting within `[start, end]`, ordered by start.
    async fn find_occurrences_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError>;
}

/// Domain-specific trait for the append-only event log
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn append_event(&self, occurred_at: DateTime<Utc>, message: &str) -> Result<EventEntry, CoreError>;
    async fn list_events(&self) -> Result<Vec<EventEntry>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository: TaskRepository + OccurrenceRepository + EventRepository {
    // This trait automatically composes all domain-specific repositories
}

/// SQLite implementation of the repository pattern
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}

/// Rejects ranges whose end precedes their start.
#[inline]
pub(crate) fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::InvalidRange { start, end });
    }
    Ok(())
}
