use std::path::{Path, PathBuf};

use cadence_core::models::{DispatcherConfig, ExecutorConfig, RecoveryConfig};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::timezone::{detect_system_timezone, normalize_timezone_input, validate_timezone};

const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// One SQLite file holds the task store, the event log and the job store
    pub database_path: String,
    /// IANA zone used to read times without an offset. Defaults to the system zone.
    pub timezone: Option<String>,
    pub log: LogConfig,
    pub scheduler: DispatcherConfig,
    pub executor: ExecutorConfig,
    pub recovery: RecoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "cadence.db".to_string(),
            timezone: None,
            log: LogConfig::default(),
            scheduler: DispatcherConfig::default(),
            executor: ExecutorConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then `CADENCE_*` environment variables.
    /// Nested keys use a double underscore: `CADENCE_SCHEDULER__POLL_INTERVAL_MS`.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("CADENCE_").split("__"))
            .extract()
    }

    /// The zone naive CLI times are read in.
    pub fn zone(&self) -> Result<Tz, cadence_core::error::CoreError> {
        match &self.timezone {
            Some(name) => validate_timezone(&normalize_timezone_input(name)?),
            None => validate_timezone(&detect_system_timezone()),
        }
    }
}
