use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use crate::db::{establish_connection, DbPool};
use crate::models::{NewOccurrence, NewTaskData, Occurrence};
use crate::repository::{OccurrenceRepository, Repository, SqliteRepository, TaskRepository};

/// Fresh database in a temp directory. Keep the `TempDir` alive for the test's duration.
pub(crate) async fn setup_test_pool() -> (DbPool, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = establish_connection(db_path.to_str().unwrap()).await.unwrap();
    (pool, temp_dir)
}

pub(crate) async fn setup_test_store() -> (Arc<SqliteRepository>, TempDir) {
    let (pool, temp_dir) = setup_test_pool().await;
    (Arc::new(SqliteRepository::new(pool)), temp_dir)
}

/// Stores a single-occurrence task starting at `start` and returns the occurrence.
pub(crate) async fn insert_occurrence(
    store: &dyn Repository,
    start: DateTime<Utc>,
    duration_minutes: i64,
) -> Occurrence {
    let task = NewTaskData {
        name: "Backup".to_string(),
        start_time: start,
        end_time: start + Duration::minutes(duration_minutes),
        duration_minutes,
        repeat_every_days: 0,
    }
    .into_task();
    store.save_task(&task).await.unwrap();

    let occurrence = NewOccurrence {
        name: task.name.clone(),
        start_time: task.start_time,
        end_time: task.end_time,
        duration_minutes,
    }
    .into_occurrence(task.id);
    store.save_occurrence(&occurrence).await.unwrap()
}
