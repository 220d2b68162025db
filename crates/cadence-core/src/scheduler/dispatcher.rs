use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::executor::{ExecutionOutcome, TaskExecutor};
use crate::models::DispatcherConfig;

use super::{FiredTrigger, JobBackend};

/// Counters reported when the dispatcher stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Triggers handed to an executor
    pub fired: usize,
    /// Triggers dropped because their window had already closed
    pub misfired: usize,
    pub completed: usize,
    pub interrupted: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, joined: Result<Result<ExecutionOutcome, CoreError>, JoinError>) {
        match joined {
            Ok(Ok(ExecutionOutcome::Completed)) => self.completed += 1,
            Ok(Ok(ExecutionOutcome::Interrupted)) => self.interrupted += 1,
            Ok(Err(e)) => {
                error!(error = %e, "task execution failed");
                self.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "task executor panicked or was aborted");
                self.failed += 1;
            }
        }
    }
}

/// Worker pool that claims due triggers and runs their executors.
pub struct TriggerDispatcher {
    backend: Arc<dyn JobBackend>,
    executor: TaskExecutor,
    config: DispatcherConfig,
}

impl TriggerDispatcher {
    pub fn new(backend: Arc<dyn JobBackend>, executor: TaskExecutor, config: DispatcherConfig) -> Self {
        Self {
            backend,
            executor,
            config,
        }
    }

    /// Polls until `cancel` fires, then waits for every running executor.
    ///
    /// Running executors receive a child of `cancel`, so shutdown cuts their
    /// workload short while still letting them write their ended event.
    pub async fn run(&self, cancel: CancellationToken) -> DispatchSummary {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));
        let mut workers: JoinSet<Result<ExecutionOutcome, CoreError>> = JoinSet::new();
        let mut summary = DispatchSummary::default();

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "dispatcher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = workers.join_next(), if !workers.is_empty() => summary.record(joined),
                _ = ticker.tick() => {
                    self.dispatch_due(&permits, &mut workers, &cancel, &mut summary).await;
                }
            }
        }

        info!(running = workers.len(), "dispatcher stopping");
        while let Some(joined) = workers.join_next().await {
            summary.record(joined);
        }
        info!(?summary, "dispatcher stopped");
        summary
    }

    async fn dispatch_due(
        &self,
        permits: &Arc<Semaphore>,
        workers: &mut JoinSet<Result<ExecutionOutcome, CoreError>>,
        cancel: &CancellationToken,
        summary: &mut DispatchSummary,
    ) {
        let available = permits.available_permits();
        if available == 0 {
            debug!("all workers busy");
            return;
        }

        let now = Utc::now();
        let limit = available.min(self.config.batch_size.max(1));
        let due = match self.backend.acquire_due(now, limit).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "failed to poll job store");
                return;
            }
        };

        for FiredTrigger { job, trigger } in due {
            if trigger.is_misfired(now) {
                warn!(job = %job.key, end = %trigger.end_at, "dropping misfired trigger");
                summary.misfired += 1;
                continue;
            }

            let permit: OwnedSemaphorePermit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, job = %job.key, "worker pool closed");
                    return;
                }
            };

            debug!(job = %job.key, start = %trigger.start_at, "firing job");
            summary.fired += 1;
            let executor = self.executor.clone();
            let token = cancel.child_token();
            workers.spawn(async move {
                let _permit = permit;
                executor.execute(job.occurrence_id, token).await
            });
        }
    }
}
