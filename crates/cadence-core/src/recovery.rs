//! Start-up re-synchronization of the job store with persisted occurrences.
//!
//! Only occurrences that start after `now` are considered. Occurrences whose
//! window elapsed while the process was down are never caught up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::models::{Occurrence, RecoveryConfig};
use crate::repository::{OccurrenceRepository, Repository};
use crate::scheduler::{JobScheduler, RescheduleOutcome, SchedulerError};

/// Tally of one recovery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub examined: usize,
    /// Existing jobs whose trigger was re-aligned
    pub rescheduled: usize,
    /// Missing jobs registered again
    pub recreated: usize,
    /// Missing jobs left missing because recreation is disabled
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryAction {
    Rescheduled,
    Recreated,
    Skipped,
}

pub struct RecoveryCoordinator {
    store: Arc<dyn Repository>,
    scheduler: JobScheduler,
    config: RecoveryConfig,
}

impl RecoveryCoordinator {
    pub fn new(store: Arc<dyn Repository>, scheduler: JobScheduler, config: RecoveryConfig) -> Self {
        Self {
            store,
            scheduler,
            config,
        }
    }

    /// Runs one best-effort pass. A failing occurrence is logged and counted,
    /// never fatal; only failing to list the occurrences aborts the pass.
    #[instrument(skip(self), fields(recreate_missing_jobs = self.config.recreate_missing_jobs))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RecoveryReport, CoreError> {
        let pending = self.store.find_occurrences_after(now).await?;
        let mut report = RecoveryReport::default();

        for occurrence in &pending {
            report.examined += 1;
            match self.recover_one(occurrence).await {
                Ok(RecoveryAction::Rescheduled) => report.rescheduled += 1,
                Ok(RecoveryAction::Recreated) => report.recreated += 1,
                Ok(RecoveryAction::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(occurrence_id = %occurrence.id, error = %e, "failed to recover occurrence");
                    report.failed += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            rescheduled = report.rescheduled,
            recreated = report.recreated,
            skipped = report.skipped,
            failed = report.failed,
            "recovery pass finished"
        );
        Ok(report)
    }

    async fn recover_one(&self, occurrence: &Occurrence) -> Result<RecoveryAction, SchedulerError> {
        match self.scheduler.reschedule_if_exists(occurrence).await? {
            RescheduleOutcome::Rescheduled => Ok(RecoveryAction::Rescheduled),
            RescheduleOutcome::NoJob if self.config.recreate_missing_jobs => {
                self.scheduler.upsert_schedule(occurrence).await?;
                Ok(RecoveryAction::Recreated)
            }
            RescheduleOutcome::NoJob => Ok(RecoveryAction::Skipped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{
        FiredTrigger, JobBackend, JobDetail, JobKey, MemoryJobBackend, Trigger, TriggerKey,
    };
    use crate::test_support::{insert_occurrence, setup_test_store};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    /// Memory backend that refuses every operation touching one job.
    struct RefusingBackend {
        inner: MemoryJobBackend,
        refused: JobKey,
    }

    impl RefusingBackend {
        fn check(&self, key: &JobKey) -> Result<(), SchedulerError> {
            if key == &self.refused {
                return Err(SchedulerError::Unavailable("refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl JobBackend for RefusingBackend {
        async fn job_exists(&self, key: &JobKey) -> Result<bool, SchedulerError> {
            self.check(key)?;
            self.inner.job_exists(key).await
        }
        async fn trigger_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
            self.inner.trigger_exists(key).await
        }
        async fn schedule(&self, job: &JobDetail, trigger: &Trigger) -> Result<(), SchedulerError> {
            self.check(&job.key)?;
            self.inner.schedule(job, trigger).await
        }
        async fn delete(&self, key: &JobKey) -> Result<bool, SchedulerError> {
            self.check(key)?;
            self.inner.delete(key).await
        }
        async fn reschedule(&self, key: &TriggerKey, trigger: &Trigger) -> Result<bool, SchedulerError> {
            self.check(&trigger.job_key)?;
            self.inner.reschedule(key, trigger).await
        }
        async fn acquire_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<FiredTrigger>, SchedulerError> {
            self.inner.acquire_due(now, limit).await
        }
        async fn next_fire_time(&self) -> Result<Option<DateTime<Utc>>, SchedulerError> {
            self.inner.next_fire_time().await
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_reschedules_existing_and_recreates_missing() {
        let (store, _dir) = setup_test_store().await;
        let backend = Arc::new(MemoryJobBackend::new());
        let scheduler = JobScheduler::new(backend.clone());

        let past = insert_occurrence(store.as_ref(), now() - Duration::hours(2), 30).await;
        let registered = insert_occurrence(store.as_ref(), now() + Duration::hours(1), 30).await;
        let missing = insert_occurrence(store.as_ref(), now() + Duration::hours(3), 30).await;
        scheduler.upsert_schedule(&registered).await.unwrap();

        let coordinator = RecoveryCoordinator::new(store.clone(), scheduler.clone(), RecoveryConfig::default());
        let report = coordinator.run(now()).await.unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.rescheduled, 1);
        assert_eq!(report.recreated, 1);
        assert!(scheduler.is_scheduled(missing.id).await.unwrap());
        assert!(!scheduler.is_scheduled(past.id).await.unwrap());
        assert_eq!(backend.job_count().await, 2);
    }

    #[tokio::test]
    async fn test_missing_jobs_are_skipped_without_reconciliation() {
        let (store, _dir) = setup_test_store().await;
        let backend = Arc::new(MemoryJobBackend::new());
        let scheduler = JobScheduler::new(backend.clone());
        insert_occurrence(store.as_ref(), now() + Duration::hours(1), 30).await;

        let config = RecoveryConfig {
            recreate_missing_jobs: false,
        };
        let report = RecoveryCoordinator::new(store.clone(), scheduler, config)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(backend.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_pass() {
        let (store, _dir) = setup_test_store().await;
        let bad = insert_occurrence(store.as_ref(), now() + Duration::hours(1), 30).await;
        let good = insert_occurrence(store.as_ref(), now() + Duration::hours(2), 30).await;

        let backend = Arc::new(RefusingBackend {
            inner: MemoryJobBackend::new(),
            refused: JobKey::for_occurrence(bad.id),
        });
        let scheduler = JobScheduler::new(backend.clone());
        let report = RecoveryCoordinator::new(store.clone(), scheduler.clone(), RecoveryConfig::default())
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.recreated, 1);
        assert!(scheduler.is_scheduled(good.id).await.unwrap());
        assert!(backend.inner.job_exists(&JobKey::for_occurrence(good.id)).await.unwrap());
    }
}
