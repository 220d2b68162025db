use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Job payload error")]
    Payload(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Task overlaps with an existing task ({start} - {end})")]
    OverlapConflict {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Scheduling failed for task {task_id}: {reason}")]
    SchedulingFailure {
        task_id: Uuid,
        occurrence_ids: Vec<Uuid>,
        reason: String,
    },

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, Name)
}

/// Coarse classification used by the request layer to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    BadRequest,
    Scheduling,
    Internal,
}

impl ErrorKind {
    /// Process exit code for this class of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::BadRequest => 2,
            ErrorKind::Conflict => 3,
            ErrorKind::Scheduling => 4,
        }
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::OverlapConflict { .. } => ErrorKind::Conflict,
            CoreError::NotFound(_)
            | CoreError::Validation(_)
            | CoreError::InvalidRange { .. }
            | CoreError::AmbiguousId(_) => ErrorKind::BadRequest,
            CoreError::SchedulingFailure { .. } => ErrorKind::Scheduling,
            CoreError::Database(_)
            | CoreError::Migration(_)
            | CoreError::Io(_)
            | CoreError::Payload(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_distinct_exit_codes() {
        let now = Utc::now();
        let conflict = CoreError::OverlapConflict { start: now, end: now };
        let range = CoreError::InvalidRange { start: now, end: now };
        let scheduling = CoreError::SchedulingFailure {
            task_id: Uuid::now_v7(),
            occurrence_ids: vec![],
            reason: "backend down".to_string(),
        };

        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(range.kind(), ErrorKind::BadRequest);
        assert_eq!(CoreError::NotFound("x".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(scheduling.kind(), ErrorKind::Scheduling);
        assert_ne!(conflict.kind().exit_code(), scheduling.kind().exit_code());
    }
}
