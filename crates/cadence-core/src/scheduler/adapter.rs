use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Occurrence;

use super::{JobBackend, JobDetail, JobKey, SchedulerError, Trigger, TriggerKey};

/// Result of [`JobScheduler::reschedule_if_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleOutcome {
    Rescheduled,
    /// No job is registered for the occurrence; nothing was changed.
    NoJob,
}

/// Maps occurrences onto job/trigger pairs in the injected backend.
#[derive(Clone)]
pub struct JobScheduler {
    backend: Arc<dyn JobBackend>,
}

impl JobScheduler {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn JobBackend> {
        &self.backend
    }

    /// Registers the occurrence's job and trigger, replacing any previous
    /// registration under the same key.
    pub async fn upsert_schedule(&self, occurrence: &Occurrence) -> Result<(), SchedulerError> {
        let job = JobDetail::for_occurrence(occurrence);
        let trigger = Trigger::for_occurrence(occurrence);

        if self.backend.job_exists(&job.key).await? {
            debug!(job = %job.key, "replacing existing job");
            self.backend.delete(&job.key).await?;
        }

        self.backend.schedule(&job, &trigger).await?;
        info!(
            job = %job.key,
            start = %trigger.start_at,
            end = %trigger.end_at,
            "scheduled job"
        );
        Ok(())
    }

    /// Moves an existing trigger to the occurrence's current window. A missing
    /// job is not an error.
    pub async fn reschedule_if_exists(&self, occurrence: &Occurrence) -> Result<RescheduleOutcome, SchedulerError> {
        let job_key = JobKey::for_occurrence(occurrence.id);
        if !self.backend.job_exists(&job_key).await? {
            debug!(job = %job_key, "no job to reschedule");
            return Ok(RescheduleOutcome::NoJob);
        }

        let trigger = Trigger::for_occurrence(occurrence);
        if !self.backend.reschedule(&TriggerKey::for_occurrence(occurrence.id), &trigger).await? {
            // Fired or deleted between the lookup and the reschedule
            debug!(job = %job_key, "job disappeared before reschedule");
            return Ok(RescheduleOutcome::NoJob);
        }

        info!(
            job = %job_key,
            start = %trigger.start_at,
            end = %trigger.end_at,
            "rescheduled job"
        );
        Ok(RescheduleOutcome::Rescheduled)
    }

    /// Removes the occurrence's job and trigger. Returns whether anything was registered.
    pub async fn cancel(&self, occurrence_id: Uuid) -> Result<bool, SchedulerError> {
        let job_key = JobKey::for_occurrence(occurrence_id);
        let removed = self.backend.delete(&job_key).await?;
        if removed {
            info!(job = %job_key, "cancelled job");
        }
        Ok(removed)
    }

    pub async fn is_scheduled(&self, occurrence_id: Uuid) -> Result<bool, SchedulerError> {
        self.backend.job_exists(&JobKey::for_occurrence(occurrence_id)).await
    }
}
