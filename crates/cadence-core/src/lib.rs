//! # Cadence Core Library
//!
//! Recurring task scheduling: a task's recurrence window is expanded into
//! concrete, non-overlapping occurrences, which are persisted and registered
//! as jobs in a durable job store. A dispatcher fires those jobs at their start
//! time, and a recovery pass re-synchronizes the job store after a restart.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Tasks, occurrences, event log entries and engine configuration
//! - [`repository`]: Task store and event log behind the Repository pattern
//! - [`overlap`]: Half-open interval overlap checks
//! - [`recurrence`]: Expansion of a task into its occurrence batch
//! - [`scheduler`]: Job store port, its backends, the adapter and the dispatcher
//! - [`lifecycle`]: Scheduling, editing and deleting tasks
//! - [`recovery`]: Start-up re-synchronization of the job store
//! - [`executor`]: Running a fired occurrence
//! - [`error`]: Error taxonomy
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use cadence_core::{
//!     db, models::NewTaskData, lifecycle::TaskService,
//!     repository::SqliteRepository,
//!     scheduler::{JobScheduler, SqliteJobBackend},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let store = Arc::new(SqliteRepository::new(pool.clone()));
//!     let scheduler = JobScheduler::new(Arc::new(SqliteJobBackend::new(pool)));
//!     let service = TaskService::new(store, scheduler);
//!
//!     let start = Utc::now() + Duration::hours(1);
//!     let scheduled = service
//!         .schedule_new_task(NewTaskData {
//!             name: "Nightly backup".to_string(),
//!             start_time: start,
//!             end_time: start + Duration::days(6),
//!             duration_minutes: 30,
//!             repeat_every_days: 1,
//!         })
//!         .await?;
//!     println!("Created {} occurrences", scheduled.occurrences.len());
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod models;
pub mod overlap;
pub mod recovery;
pub mod recurrence;
pub mod repository;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
