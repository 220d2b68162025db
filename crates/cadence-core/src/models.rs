use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::CoreError;

/// Drops sub-second precision so stored timestamps compare correctly as text.
#[inline]
pub fn normalize_timestamp(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(0)
}

/// A recurrence definition: a window, a per-occurrence duration and a repeat
/// interval in days (0 means a single occurrence).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub repeat_every_days: i64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Occurrence length and repeat step, `None` step for a single occurrence.
    pub fn spans(&self) -> Result<(Duration, Option<Duration>), CoreError> {
        checked_spans(self.end_time, self.duration_minutes, self.repeat_every_days)
    }
}

/// Converts minutes and days into chrono spans, rejecting values whose windows
/// would leave the representable date range.
///
/// No window starts after `end_time`, so bounding `end_time + duration` and
/// `end_time + step` bounds every window of the task.
pub fn checked_spans(
    end_time: DateTime<Utc>,
    duration_minutes: i64,
    repeat_every_days: i64,
) -> Result<(Duration, Option<Duration>), CoreError> {
    let out_of_range = || {
        CoreError::Validation(format!(
            "A {} minute duration repeating every {} days is out of range",
            duration_minutes, repeat_every_days
        ))
    };

    let duration = Duration::try_minutes(duration_minutes).ok_or_else(out_of_range)?;
    end_time.checked_add_signed(duration).ok_or_else(out_of_range)?;

    let step = if repeat_every_days > 0 {
        let step = Duration::try_days(repeat_every_days).ok_or_else(out_of_range)?;
        end_time.checked_add_signed(step).ok_or_else(out_of_range)?;
        Some(step)
    } else {
        None
    };
    Ok((duration, step))
}

/// One concrete, schedulable instance of a [`Task`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Occurrence {
    pub id: Uuid,
    /// Owning task. Deleting the task deletes every occurrence that points at it.
    pub task_id: Uuid,
    /// Copied from the task at generation time, editable afterwards
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An occurrence produced by the generator that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOccurrence {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl NewOccurrence {
    /// Assigns identity and ownership, producing the record to store.
    pub fn into_occurrence(self, task_id: Uuid) -> Occurrence {
        let now = normalize_timestamp(Utc::now());
        Occurrence {
            // random: a whole batch shares one millisecond, short prefixes must still differ
            id: Uuid::new_v4(),
            task_id,
            name: self.name,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

/// Data required to schedule a new recurring task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskData {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes, must be positive
    pub duration_minutes: i64,
    /// Days between occurrences, 0 for a single occurrence
    #[serde(default)]
    pub repeat_every_days: i64,
}

impl NewTaskData {
    /// Rejects malformed input before anything is persisted.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Task name must not be empty".to_string()));
        }
        if self.duration_minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "Duration must be positive, got {} minutes",
                self.duration_minutes
            )));
        }
        if self.repeat_every_days < 0 {
            return Err(CoreError::Validation(format!(
                "Repeat interval must not be negative, got {} days",
                self.repeat_every_days
            )));
        }
        let (duration, _) = checked_spans(self.end_time, self.duration_minutes, self.repeat_every_days)?;
        if self.end_time < self.start_time {
            return Err(CoreError::InvalidRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if self.repeat_every_days == 0 && duration > self.end_time - self.start_time {
            return Err(CoreError::Validation(
                "A single occurrence must fit between start and end time".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the task record with a fresh identity.
    pub fn into_task(self) -> Task {
        Task {
            id: Uuid::now_v7(),
            name: self.name,
            start_time: normalize_timestamp(self.start_time),
            end_time: normalize_timestamp(self.end_time),
            duration_minutes: self.duration_minutes,
            repeat_every_days: self.repeat_every_days,
            created_at: normalize_timestamp(Utc::now()),
        }
    }
}

/// Field changes for a single occurrence. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOccurrenceData {
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

impl UpdateOccurrenceData {
    /// Applies the changes to `current` and validates the result.
    pub fn apply_to(&self, current: &Occurrence) -> Result<Occurrence, CoreError> {
        let mut updated = current.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(start) = self.start_time {
            updated.start_time = normalize_timestamp(start);
        }
        if let Some(end) = self.end_time {
            updated.end_time = normalize_timestamp(end);
        }
        if let Some(duration) = self.duration_minutes {
            updated.duration_minutes = duration;
        }

        if updated.name.trim().is_empty() {
            return Err(CoreError::Validation("Occurrence name must not be empty".to_string()));
        }
        if updated.duration_minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "Duration must be positive, got {} minutes",
                updated.duration_minutes
            )));
        }
        if updated.end_time <= updated.start_time {
            return Err(CoreError::InvalidRange {
                start: updated.start_time,
                end: updated.end_time,
            });
        }

        updated.updated_at = normalize_timestamp(Utc::now());
        Ok(updated)
    }
}

/// Result of a successful scheduling request.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTask {
    pub task: Task,
    pub occurrences: Vec<Occurrence>,
}

// ============================================================================
// Event Log
// ============================================================================

/// Immutable audit record written by the task executor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct EventEntry {
    pub id: i64,
    pub occurred_at: DateTime<Utc>,
    pub message: String,
}

/// Display form of an [`EventEntry`] with a string-formatted timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventReport {
    pub time: String,
    pub message: String,
}

impl From<&EventEntry> for EventReport {
    fn from(entry: &EventEntry) -> Self {
        Self {
            time: entry.occurred_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            message: entry.message.clone(),
        }
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Configuration for the trigger dispatcher worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How often to poll the job store for due triggers
    pub poll_interval_ms: u64,
    /// Upper bound on executors running at the same time
    pub max_concurrent_jobs: usize,
    /// Triggers claimed per poll
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_concurrent_jobs: 8,
            batch_size: 32,
        }
    }
}

/// Configuration for the task executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock milliseconds that make up one workload minute
    pub minute_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { minute_ms: 60_000 }
    }
}

/// Configuration for the startup recovery pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Recreate jobs that are missing entirely from the job store
    pub recreate_missing_jobs: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            recreate_missing_jobs: true,
        }
    }
}
