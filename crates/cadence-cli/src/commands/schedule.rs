use anyhow::Result;
use cadence_core::models::NewTaskData;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};

use super::AppContext;
use crate::cli::ScheduleCommand;
use crate::parser::parse_datetime;
use crate::views::table::display_occurrences;

pub async fn schedule_task(ctx: &AppContext, command: ScheduleCommand) -> Result<()> {
    let now = Utc::now();
    let data = NewTaskData {
        name: command.name,
        start_time: parse_datetime(&command.start, ctx.zone, now)?,
        end_time: parse_datetime(&command.end, ctx.zone, now)?,
        duration_minutes: command.duration,
        repeat_every_days: command.every,
    };

    let scheduled = ctx.service.schedule_new_task(data).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    println!(
        "{} Scheduled task: {}",
        "✓".style(success_style),
        scheduled.task.name.bright_white().bold()
    );
    println!(
        "  {} Task ID: {}",
        "→".style(info_style),
        scheduled.task.id.to_string().yellow()
    );
    println!(
        "  {} {} occurrence(s) created",
        "→".style(info_style),
        scheduled.occurrences.len()
    );
    display_occurrences(&scheduled.occurrences, ctx.zone);

    Ok(())
}
