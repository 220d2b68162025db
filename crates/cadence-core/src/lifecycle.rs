//! Task lifecycle: scheduling, editing and deleting recurring tasks.
//!
//! Persistence and job registration form a saga rather than one transaction.
//! Validation and overlap failures abort before anything is kept. Job
//! registration failures after the data is committed are reported as
//! [`CoreError::SchedulingFailure`] and leave the data in place for the
//! recovery pass to heal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{EventReport, NewTaskData, Occurrence, ScheduledTask, Task, UpdateOccurrenceData};
use crate::overlap::StoreOverlapChecker;
use crate::recurrence::OccurrenceGenerator;
use crate::repository::{EventRepository, OccurrenceRepository, Repository, TaskRepository};
use crate::scheduler::{JobScheduler, SchedulerError};

/// What [`TaskService::delete_task`] removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTask {
    pub task_id: Uuid,
    pub occurrence_ids: Vec<Uuid>,
}

/// Entry point for every mutating operation.
///
/// Mutations are serialized through a single writer lock, so two requests can
/// never interleave their overlap check and their insert, and per-occurrence
/// job operations never race each other.
pub struct TaskService {
    store: Arc<dyn Repository>,
    scheduler: JobScheduler,
    generator: OccurrenceGenerator,
    write_lock: Mutex<()>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Repository>, scheduler: JobScheduler) -> Self {
        Self {
            store,
            scheduler,
            generator: OccurrenceGenerator::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Repository> {
        &self.store
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Persists a task, expands it into occurrences and registers a job for each.
    ///
    /// # Errors
    /// * `Validation` / `InvalidRange` - malformed input, nothing persisted
    /// * `OverlapConflict` - an occurrence collides; the task is rolled back
    /// * `SchedulingFailure` - data committed, but some jobs could not be registered
    #[instrument(skip(self, data), fields(name = %data.name))]
    pub async fn schedule_new_task(&self, data: NewTaskData) -> Result<ScheduledTask, CoreError> {
        data.validate()?;
        let _guard = self.write_lock.lock().await;

        let task = self.store.save_task(&data.into_task()).await?;

        let generated = {
            let committed = StoreOverlapChecker::new(self.store.as_ref());
            self.generator.generate(&task, &committed).await
        };
        let batch = match generated {
            Ok(batch) => batch,
            Err(e) => {
                self.rollback_task(&task).await;
                return Err(e);
            }
        };

        let occurrences: Vec<Occurrence> = batch.into_iter().map(|o| o.into_occurrence(task.id)).collect();
        if let Err(e) = self.store.save_occurrences(&occurrences).await {
            self.rollback_task(&task).await;
            return Err(e);
        }
        info!(task_id = %task.id, count = occurrences.len(), "persisted occurrences");

        let mut failed = Vec::new();
        let mut first_failure: Option<SchedulerError> = None;
        for occurrence in &occurrences {
            if let Err(e) = self.scheduler.upsert_schedule(occurrence).await {
                error!(occurrence_id = %occurrence.id, error = %e, "failed to register job");
                failed.push(occurrence.id);
                first_failure.get_or_insert(e);
            }
        }

        if let Some(reason) = first_failure {
            return Err(CoreError::SchedulingFailure {
                task_id: task.id,
                occurrence_ids: failed,
                reason: reason.to_string(),
            });
        }

        Ok(ScheduledTask { task, occurrences })
    }

    async fn rollback_task(&self, task: &Task) {
        if let Err(e) = self.store.delete_task(task.id).await {
            error!(task_id = %task.id, error = %e, "failed to roll back task");
        } else {
            info!(task_id = %task.id, "rolled back task");
        }
    }

    /// Edits one occurrence. Fields left as `None` keep their current value.
    ///
    /// The edited window is checked against every other stored occurrence, and
    /// a live trigger is moved to follow it.
    ///
    /// # Errors
    /// * `NotFound` - no occurrence with this id
    /// * `Validation` / `InvalidRange` - malformed fields
    /// * `OverlapConflict` - the new window collides with another occurrence
    /// * `SchedulingFailure` - the edit was kept but the trigger could not be moved
    #[instrument(skip(self, data))]
    pub async fn update_occurrence(&self, occurrence_id: Uuid, data: UpdateOccurrenceData) -> Result<Occurrence, CoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self.load_occurrence(occurrence_id).await?;
        let updated = data.apply_to(&current)?;

        let collisions = self
            .store
            .find_occurrences_overlapping_excluding(updated.start_time, updated.end_time, updated.id)
            .await?;
        if !collisions.is_empty() {
            return Err(CoreError::OverlapConflict {
                start: updated.start_time,
                end: updated.end_time,
            });
        }

        let updated = self.store.save_occurrence(&updated).await?;

        if let Err(e) = self.scheduler.reschedule_if_exists(&updated).await {
            error!(error = %e, "failed to reschedule edited occurrence");
            return Err(CoreError::SchedulingFailure {
                task_id: updated.task_id,
                occurrence_ids: vec![updated.id],
                reason: e.to_string(),
            });
        }

        Ok(updated)
    }

    /// Deletes the whole task owning `occurrence_id`, together with every
    /// sibling occurrence and their jobs.
    ///
    /// # Errors
    /// * `NotFound` - no occurrence with this id
    /// * `SchedulingFailure` - the data is gone but some jobs could not be cancelled
    #[instrument(skip(self))]
    pub async fn delete_task(&self, occurrence_id: Uuid) -> Result<DeletedTask, CoreError> {
        let _guard = self.write_lock.lock().await;

        let occurrence = self.load_occurrence(occurrence_id).await?;
        let task_id = occurrence.task_id;
        let siblings = self.store.find_occurrences_by_task(task_id).await?;

        let mut failed = Vec::new();
        let mut first_failure: Option<SchedulerError> = None;
        for sibling in &siblings {
            if let Err(e) = self.scheduler.cancel(sibling.id).await {
                warn!(occurrence_id = %sibling.id, error = %e, "failed to cancel job");
                failed.push(sibling.id);
                first_failure.get_or_insert(e);
            }
        }

        let removed = self.store.delete_task_cascade(task_id).await?;
        info!(%task_id, removed, "deleted task");

        if let Some(reason) = first_failure {
            return Err(CoreError::SchedulingFailure {
                task_id,
                occurrence_ids: failed,
                reason: reason.to_string(),
            });
        }

        Ok(DeletedTask {
            task_id,
            occurrence_ids: siblings.into_iter().map(|o| o.id).collect(),
        })
    }

    async fn load_occurrence(&self, occurrence_id: Uuid) -> Result<Occurrence, CoreError> {
        self.store
            .find_occurrence_by_id(occurrence_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Occurrence with id {} not found", occurrence_id)))
    }

    pub async fn find_occurrence(&self, occurrence_id: Uuid) -> Result<Occurrence, CoreError> {
        self.load_occurrence(occurrence_id).await
    }

    pub async fn occurrences_after(&self, time: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        self.store.find_occurrences_after(time).await
    }

    pub async fn occurrences_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        self.store.find_occurrences_between(start, end).await
    }

    pub async fn event_reports(&self) -> Result<Vec<EventReport>, CoreError> {
        let events = self.store.list_events().await?;
        Ok(events.iter().map(EventReport::from).collect())
    }
}
