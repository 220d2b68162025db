use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{FiredTrigger, JobBackend, JobDetail, JobKey, SchedulerError, Trigger, TriggerKey};

#[derive(Debug, Default)]
struct Registry {
    jobs: HashMap<JobKey, JobDetail>,
    triggers: HashMap<TriggerKey, Trigger>,
}

/// In-process job backend. Same contract as the SQLite store, but nothing
/// survives the process.
#[derive(Debug, Default)]
pub struct MemoryJobBackend {
    registry: Mutex<Registry>,
}

impl MemoryJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn job_count(&self) -> usize {
        self.registry.lock().await.jobs.len()
    }

    pub async fn trigger(&self, key: &TriggerKey) -> Option<Trigger> {
        self.registry.lock().await.triggers.get(key).cloned()
    }
}

#[async_trait]
impl JobBackend for MemoryJobBackend {
    async fn job_exists(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        Ok(self.registry.lock().await.jobs.contains_key(key))
    }

    async fn trigger_exists(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
        Ok(self.registry.lock().await.triggers.contains_key(key))
    }

    async fn schedule(&self, job: &JobDetail, trigger: &Trigger) -> Result<(), SchedulerError> {
        let mut registry = self.registry.lock().await;
        if registry.jobs.contains_key(&job.key) {
            return Err(SchedulerError::AlreadyExists(job.key.clone()));
        }
        registry.jobs.insert(job.key.clone(), job.clone());
        registry.triggers.insert(trigger.key.clone(), trigger.clone());
        Ok(())
    }

    async fn delete(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        let mut registry = self.registry.lock().await;
        registry.triggers.retain(|_, t| &t.job_key != key);
        Ok(registry.jobs.remove(key).is_some())
    }

    async fn reschedule(&self, key: &TriggerKey, trigger: &Trigger) -> Result<bool, SchedulerError> {
        let mut registry = self.registry.lock().await;
        if !registry.jobs.contains_key(&trigger.job_key) {
            return Ok(false);
        }
        registry.triggers.remove(key);
        registry.triggers.insert(trigger.key.clone(), trigger.clone());
        Ok(true)
    }

    async fn acquire_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<FiredTrigger>, SchedulerError> {
        let mut registry = self.registry.lock().await;

        let mut due: Vec<Trigger> = registry
            .triggers
            .values()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.key.cmp(&b.key)));
        due.truncate(limit);

        let mut fired = Vec::with_capacity(due.len());
        for trigger in due {
            registry.triggers.remove(&trigger.key);
            if let Some(job) = registry.jobs.remove(&trigger.job_key) {
                registry.triggers.retain(|_, t| t.job_key != job.key);
                fired.push(FiredTrigger { job, trigger });
            }
        }
        Ok(fired)
    }

    async fn next_fire_time(&self) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        Ok(self.registry.lock().await.triggers.values().map(|t| t.start_at).min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewOccurrence, Occurrence};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn occurrence_at(hour: u32) -> Occurrence {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        NewOccurrence {
            name: "Backup".to_string(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            duration_minutes: 30,
        }
        .into_occurrence(Uuid::now_v7())
    }

    async fn register(backend: &MemoryJobBackend, occurrence: &Occurrence) {
        backend
            .schedule(&JobDetail::for_occurrence(occurrence), &Trigger::for_occurrence(occurrence))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_schedule_rejects_existing_job_key() {
        let backend = MemoryJobBackend::new();
        let occurrence = occurrence_at(9);
        register(&backend, &occurrence).await;

        let again = backend
            .schedule(&JobDetail::for_occurrence(&occurrence), &Trigger::for_occurrence(&occurrence))
            .await;
        assert!(matches!(again, Err(SchedulerError::AlreadyExists(_))));
        assert_eq!(backend.job_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_job_and_trigger() {
        let backend = MemoryJobBackend::new();
        let occurrence = occurrence_at(9);
        register(&backend, &occurrence).await;

        let key = JobKey::for_occurrence(occurrence.id);
        assert!(backend.delete(&key).await.unwrap());
        assert!(!backend.job_exists(&key).await.unwrap());
        assert!(!backend.trigger_exists(&TriggerKey::for_occurrence(occurrence.id)).await.unwrap());
        assert!(!backend.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_reschedule_requires_job() {
        let backend = MemoryJobBackend::new();
        let occurrence = occurrence_at(9);
        let trigger = Trigger::for_occurrence(&occurrence);

        assert!(!backend.reschedule(&trigger.key, &trigger).await.unwrap());
        assert!(!backend.trigger_exists(&trigger.key).await.unwrap());

        register(&backend, &occurrence).await;
        let mut moved = trigger.clone();
        moved.start_at += Duration::hours(2);
        moved.end_at += Duration::hours(2);
        assert!(backend.reschedule(&trigger.key, &moved).await.unwrap());
        assert_eq!(backend.trigger(&trigger.key).await, Some(moved));
    }

    #[tokio::test]
    async fn test_acquire_due_claims_earliest_first() {
        let backend = MemoryJobBackend::new();
        let late = occurrence_at(11);
        let early = occurrence_at(9);
        let future = occurrence_at(15);
        for o in [&late, &early, &future] {
            register(&backend, o).await;
        }

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(backend.next_fire_time().await.unwrap(), Some(early.start_time));

        let first = backend.acquire_due(now, 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].job.occurrence_id, early.id);

        let rest = backend.acquire_due(now, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].job.occurrence_id, late.id);

        // claimed jobs are gone; the future one stays registered
        assert!(backend.acquire_due(now, 10).await.unwrap().is_empty());
        assert_eq!(backend.job_count().await, 1);
        assert_eq!(backend.next_fire_time().await.unwrap(), Some(future.start_time));
    }
}
