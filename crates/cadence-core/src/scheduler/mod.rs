//! Durable job scheduling.
//!
//! Every occurrence maps onto exactly one job and one trigger whose keys are
//! derived from the occurrence id, so registering the same occurrence twice
//! always addresses the same pair.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{normalize_timestamp, Occurrence};

pub mod adapter;
pub mod dispatcher;
pub mod memory;
pub mod sqlite;

pub use adapter::{JobScheduler, RescheduleOutcome};
pub use dispatcher::{DispatchSummary, TriggerDispatcher};
pub use memory::MemoryJobBackend;
pub use sqlite::SqliteJobBackend;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Job store error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Job payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Job {0} already exists")]
    AlreadyExists(JobKey),

    #[error("Job store unavailable: {0}")]
    Unavailable(String),
}

/// Identifies a job: `task-<occurrence id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn for_occurrence(occurrence_id: Uuid) -> Self {
        Self(format!("task-{}", occurrence_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a trigger: `trigger-<occurrence id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerKey(String);

impl TriggerKey {
    pub fn for_occurrence(occurrence_id: Uuid) -> Self {
        Self(format!("trigger-{}", occurrence_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit of work handed to the executor when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    pub key: JobKey,
    pub occurrence_id: Uuid,
}

impl JobDetail {
    pub fn for_occurrence(occurrence: &Occurrence) -> Self {
        Self {
            key: JobKey::for_occurrence(occurrence.id),
            occurrence_id: occurrence.id,
        }
    }
}

/// Firing window of a job. The job fires once `start_at` is reached and is
/// considered misfired if it is still unclaimed once `end_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Trigger {
    pub fn for_occurrence(occurrence: &Occurrence) -> Self {
        Self {
            key: TriggerKey::for_occurrence(occurrence.id),
            job_key: JobKey::for_occurrence(occurrence.id),
            start_at: normalize_timestamp(occurrence.start_time),
            end_at: normalize_timestamp(occurrence.end_time),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now
    }

    pub fn is_misfired(&self, now: DateTime<Utc>) -> bool {
        self.end_at <= now
    }
}

/// A claimed trigger together with its job. Claiming removes both from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger {
    pub job: JobDetail,
    pub trigger: Trigger,
}

/// Port onto the durable job registry.
///
/// Implementations must make `schedule`, `delete`, `reschedule` and
/// `acquire_due` individually atomic. They are not required to serialize
/// concurrent calls for the same job key.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn job_exists(&self, key: &JobKey) -> Result<bool, SchedulerError>;

    async fn trigger_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError>;

    /// Registers a job and its trigger together.
    ///
    /// Fails with [`SchedulerError::AlreadyExists`] when the job key is taken.
    async fn schedule(&self, job: &JobDetail, trigger: &Trigger) -> Result<(), SchedulerError>;

    /// Removes a job and every trigger pointing at it. Returns whether the job existed.
    async fn delete(&self, key: &JobKey) -> Result<bool, SchedulerError>;

    /// Replaces the trigger stored under `key` with `trigger`.
    ///
    /// Returns `false` without changing anything when the trigger's job is not registered.
    async fn reschedule(&self, key: &TriggerKey, trigger: &Trigger) -> Result<bool, SchedulerError>;

    /// Claims up to `limit` triggers whose start has been reached, earliest first.
    async fn acquire_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<FiredTrigger>, SchedulerError>;

    /// Earliest start among the registered triggers.
    async fn next_fire_time(&self) -> Result<Option<DateTime<Utc>>, SchedulerError>;
}
