use anyhow::Result;
use chrono::Utc;

use super::AppContext;
use crate::cli::ListCommand;
use crate::parser::parse_datetime;
use crate::views::table::display_occurrences;

pub async fn list_occurrences(ctx: &AppContext, command: ListCommand) -> Result<()> {
    let now = Utc::now();

    let occurrences = match (command.from, command.to) {
        (Some(from), Some(to)) => {
            let start = parse_datetime(&from, ctx.zone, now)?;
            let end = parse_datetime(&to, ctx.zone, now)?;
            ctx.service.occurrences_between(start, end).await?
        }
        _ => {
            let after = command
                .after
                .map(|a| parse_datetime(&a, ctx.zone, now))
                .transpose()?
                .unwrap_or(now);
            ctx.service.occurrences_after(after).await?
        }
    };

    display_occurrences(&occurrences, ctx.zone);
    Ok(())
}
