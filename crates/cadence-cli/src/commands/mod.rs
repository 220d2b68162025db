use cadence_core::lifecycle::TaskService;
use chrono_tz::Tz;

use crate::config::Config;

pub mod delete;
pub mod edit;
pub mod list;
pub mod recover;
pub mod reports;
pub mod schedule;
pub mod serve;

/// Everything a command needs, built once by `main`.
pub struct AppContext {
    pub service: TaskService,
    pub config: Config,
    /// Zone used to read and print local times
    pub zone: Tz,
}
