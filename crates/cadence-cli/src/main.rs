use std::sync::Arc;

use cadence_core::db;
use cadence_core::error::{CoreError, ErrorKind};
use cadence_core::lifecycle::TaskService;
use cadence_core::repository::{Repository, SqliteRepository};
use cadence_core::scheduler::{JobScheduler, SqliteJobBackend};
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing::warn;

use commands::AppContext;

mod cli;
mod commands;
mod config;
mod logging;
mod parser;
mod timezone;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match config::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(ErrorKind::BadRequest.exit_code());
        }
    };

    if let Err(e) = logging::init_logging(&config.log) {
        eprintln!("{} {}", "Error:".red().bold(), e);
    }

    if let Err(e) = run(cli.command, config).await {
        std::process::exit(handle_error(e));
    }
}

async fn run(command: cli::Commands, config: config::Config) -> anyhow::Result<()> {
    let zone = config.zone()?;
    let pool = db::establish_connection(&config.database_path).await?;
    let store: Arc<dyn Repository> = Arc::new(SqliteRepository::new(pool.clone()));
    let scheduler = JobScheduler::new(Arc::new(SqliteJobBackend::new(pool)));

    let ctx = AppContext {
        service: TaskService::new(store, scheduler),
        config,
        zone,
    };

    // Mutations never race the start-up re-synchronization
    if command.is_mutating() {
        let report = commands::recover::run_recovery(&ctx, commands::recover::realign_only()).await?;
        if report.failed > 0 {
            warn!(failed = report.failed, "recovery pass left some occurrences unsynchronized");
        }
    }

    match command {
        cli::Commands::Schedule(command) => commands::schedule::schedule_task(&ctx, command).await,
        cli::Commands::List(command) => commands::list::list_occurrences(&ctx, command).await,
        cli::Commands::Reports(command) => commands::reports::show_reports(&ctx, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_occurrence(&ctx, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_task(&ctx, command).await,
        cli::Commands::Serve => commands::serve::serve(&ctx).await,
        cli::Commands::Recover(command) => commands::recover::recover(&ctx, command).await,
    }
}

/// Prints the error and returns the process exit code for it.
fn handle_error(err: anyhow::Error) -> i32 {
    let error_style = Style::new().red().bold();
    let core_error = err.chain().find_map(|e| e.downcast_ref::<CoreError>());

    let Some(core_error) = core_error else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
        return ErrorKind::Internal.exit_code();
    };

    match core_error {
        CoreError::OverlapConflict { start, end } => {
            eprintln!(
                "{} Conflict: the occurrence {} - {} overlaps an existing task",
                "Error:".style(error_style),
                start.to_rfc3339().yellow(),
                end.to_rfc3339().yellow()
            );
        }
        CoreError::InvalidRange { start, end } => {
            eprintln!(
                "{} Invalid range: end {} is before start {}",
                "Error:".style(error_style),
                end.to_rfc3339().yellow(),
                start.to_rfc3339().yellow()
            );
        }
        CoreError::AmbiguousId(occurrences) => {
            eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
            eprintln!("Did you mean one of these?");
            for (id, name) in occurrences {
                eprintln!("  {} ({})", id.yellow(), name);
            }
        }
        CoreError::Validation(s) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        CoreError::SchedulingFailure { occurrence_ids, reason, .. } => {
            eprintln!(
                "{} Scheduling failed for {} occurrence(s): {}",
                "Error:".style(error_style),
                occurrence_ids.len(),
                reason
            );
            eprintln!(
                "  {} The task data was kept; run `cadence recover` to register the missing jobs.",
                "→".style(Style::new().blue())
            );
        }
        CoreError::NotFound(s) => {
            eprintln!("{} {}", "Error:".style(error_style), s);
        }
        _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }

    core_error.kind().exit_code()
}
