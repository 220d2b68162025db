use anyhow::Result;
use cadence_core::models::RecoveryConfig;
use cadence_core::recovery::{RecoveryCoordinator, RecoveryReport};
use chrono::Utc;

use super::AppContext;
use crate::cli::RecoverCommand;
use crate::views::table::display_recovery_report;

/// Settings for the pass that precedes a mutating command.
///
/// A `serve` process may be claiming jobs from the same database, so this pass
/// only re-aligns triggers that still exist. Missing jobs are registered again
/// by `cadence recover` and by `cadence serve` at start-up.
pub fn realign_only() -> RecoveryConfig {
    RecoveryConfig {
        recreate_missing_jobs: false,
    }
}

/// Runs one recovery pass.
pub async fn run_recovery(ctx: &AppContext, config: RecoveryConfig) -> Result<RecoveryReport> {
    let coordinator = RecoveryCoordinator::new(ctx.service.store().clone(), ctx.service.scheduler().clone(), config);
    Ok(coordinator.run(Utc::now()).await?)
}

pub async fn recover(ctx: &AppContext, command: RecoverCommand) -> Result<()> {
    let report = run_recovery(ctx, ctx.config.recovery.clone()).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_recovery_report(&report);
    }
    Ok(())
}
