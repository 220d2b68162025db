use anyhow::Result;
use cadence_core::executor::TaskExecutor;
use cadence_core::scheduler::{JobBackend, TriggerDispatcher};
use owo_colors::{OwoColorize, Style};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::recover::run_recovery;
use super::AppContext;
use crate::timezone::format_in_zone;
use crate::views::table::display_recovery_report;

/// Recovery first, then the dispatcher until Ctrl-C.
pub async fn serve(ctx: &AppContext) -> Result<()> {
    let report = run_recovery(ctx, ctx.config.recovery.clone()).await?;
    display_recovery_report(&report);

    let backend = ctx.service.scheduler().backend().clone();
    let executor = TaskExecutor::new(ctx.service.store().clone(), ctx.config.executor.clone());
    let dispatcher = TriggerDispatcher::new(backend.clone(), executor, ctx.config.scheduler.clone());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    println!(
        "{} Scheduler running. Press Ctrl-C to stop.",
        "●".style(Style::new().green().bold())
    );
    match backend.next_fire_time().await {
        Ok(Some(next)) => println!("  Next job fires at {}", format_in_zone(next, ctx.zone).cyan()),
        Ok(None) => println!("  No jobs are scheduled."),
        Err(e) => warn!(error = %e, "cannot read next fire time"),
    }

    let summary = dispatcher.run(cancel).await;
    println!(
        "Stopped. fired: {}, completed: {}, interrupted: {}, misfired: {}, failed: {}",
        summary.fired, summary.completed, summary.interrupted, summary.misfired, summary.failed
    );
    Ok(())
}
