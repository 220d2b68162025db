use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};

use super::AppContext;
use crate::cli::DeleteCommand;
use crate::util::resolve_occurrence_id;

pub async fn delete_task(ctx: &AppContext, command: DeleteCommand) -> Result<()> {
    let occurrence_id = resolve_occurrence_id(ctx.service.store().as_ref(), &command.id).await?;
    let occurrence = ctx.service.find_occurrence(occurrence_id).await?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Delete task '{}' and all of its occurrences?",
                occurrence.name
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let deleted = ctx.service.delete_task(occurrence.id).await?;
    println!(
        "{} Deleted task '{}' ({} occurrence(s))",
        "✓".style(Style::new().green().bold()),
        occurrence.name.bright_white().bold(),
        deleted.occurrence_ids.len()
    );
    Ok(())
}
