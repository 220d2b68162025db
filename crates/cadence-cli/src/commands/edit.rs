use anyhow::Result;
use cadence_core::models::UpdateOccurrenceData;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};

use super::AppContext;
use crate::cli::EditCommand;
use crate::parser::parse_datetime;
use crate::timezone::format_in_zone;
use crate::util::resolve_occurrence_id;

pub async fn edit_occurrence(ctx: &AppContext, command: EditCommand) -> Result<()> {
    let occurrence_id = resolve_occurrence_id(ctx.service.store().as_ref(), &command.id).await?;
    let now = Utc::now();

    let update = UpdateOccurrenceData {
        name: command.name,
        start_time: command.start.map(|s| parse_datetime(&s, ctx.zone, now)).transpose()?,
        end_time: command.end.map(|e| parse_datetime(&e, ctx.zone, now)).transpose()?,
        duration_minutes: command.duration,
    };

    let updated = ctx.service.update_occurrence(occurrence_id, update).await?;

    println!(
        "{} Updated occurrence: {}",
        "✓".style(Style::new().green().bold()),
        updated.name.bright_white().bold()
    );
    println!(
        "  {} {} - {} ({} min)",
        "→".style(Style::new().blue()),
        format_in_zone(updated.start_time, ctx.zone).cyan(),
        format_in_zone(updated.end_time, ctx.zone).cyan(),
        updated.duration_minutes
    );
    Ok(())
}
