use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{ExecutorConfig, Occurrence};
use crate::repository::{EventRepository, OccurrenceRepository, Repository};

/// How a workload wait finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    /// The wait was cut short by cancellation. The ended event was still written.
    Interrupted,
}

/// Runs one fired occurrence: a started event, the workload wait, an ended event.
#[derive(Clone)]
pub struct TaskExecutor {
    store: Arc<dyn Repository>,
    config: ExecutorConfig,
}

pub fn started_message(occurrence_id: Uuid) -> String {
    format!("Task {} started", occurrence_id)
}

pub fn ended_message(occurrence_id: Uuid) -> String {
    format!("Task {} ended", occurrence_id)
}

impl TaskExecutor {
    pub fn new(store: Arc<dyn Repository>, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    /// Wall-clock length of the occurrence's workload.
    pub fn workload_wait(&self, occurrence: &Occurrence) -> Duration {
        let minutes = u64::try_from(occurrence.duration_minutes).unwrap_or(0);
        Duration::from_millis(minutes.saturating_mul(self.config.minute_ms))
    }

    /// Executes the occurrence identified by `occurrence_id`.
    ///
    /// # Errors
    /// * `NotFound` - the occurrence vanished after it was scheduled; nothing is logged
    /// * `Database` - an event could not be appended
    #[instrument(skip(self, cancel), fields(occurrence_id = %occurrence_id))]
    pub async fn execute(&self, occurrence_id: Uuid, cancel: CancellationToken) -> Result<ExecutionOutcome, CoreError> {
        let occurrence = self
            .store
            .find_occurrence_by_id(occurrence_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Occurrence with id {} not found", occurrence_id)))?;

        self.store.append_event(Utc::now(), &started_message(occurrence.id)).await?;
        info!(name = %occurrence.name, duration_minutes = occurrence.duration_minutes, "task started");

        let outcome = tokio::select! {
            _ = tokio::time::sleep(self.workload_wait(&occurrence)) => ExecutionOutcome::Completed,
            _ = cancel.cancelled() => ExecutionOutcome::Interrupted,
        };

        if outcome == ExecutionOutcome::Interrupted {
            warn!("task interrupted before its workload finished");
        }

        self.store.append_event(Utc::now(), &ended_message(occurrence.id)).await?;
        info!(?outcome, "task ended");
        Ok(outcome)
    }
}
