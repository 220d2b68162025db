use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence: schedules recurring tasks as non-overlapping occurrences and runs them on time
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file (default: ./cadence.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Schedule a new recurring task
    Schedule(ScheduleCommand),
    /// List occurrences by time
    List(ListCommand),
    /// Show the execution log
    Reports(ReportsCommand),
    /// Edit a single occurrence
    Edit(EditCommand),
    /// Delete the task an occurrence belongs to, with all its occurrences
    Delete(DeleteCommand),
    /// Run the scheduler until interrupted
    Serve,
    /// Re-synchronize the job store with stored occurrences
    Recover(RecoverCommand),
}

impl Commands {
    /// Commands that change tasks or jobs. These run after the recovery pass.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Commands::Schedule(_) | Commands::Edit(_) | Commands::Delete(_))
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ScheduleCommand {
    /// The name of the task
    pub name: String,
    /// First occurrence start
    #[arg(long, help = "First occurrence start (RFC 3339, 'YYYY-MM-DD HH:MM' or e.g. 'tomorrow 9am')")]
    pub start: String,
    /// Last moment an occurrence may start
    #[arg(long, help = "Last moment an occurrence may start")]
    pub end: String,
    /// Length of each occurrence in minutes
    #[arg(short, long, allow_negative_numbers = true)]
    pub duration: i64,
    /// Days between occurrences; 0 schedules a single occurrence
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub every: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Occurrences starting after this time (default: now)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub after: Option<String>,
    /// Occurrences starting at or after this time
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Occurrences starting at or before this time
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ReportsCommand {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or unique ID prefix) of the occurrence to edit
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub duration: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID (or unique ID prefix) of any occurrence of the task
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecoverCommand {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
