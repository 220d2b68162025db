use anyhow::Result;

use super::AppContext;
use crate::cli::ReportsCommand;
use crate::views::table::display_reports;

pub async fn show_reports(ctx: &AppContext, command: ReportsCommand) -> Result<()> {
    let reports = ctx.service.event_reports().await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        display_reports(&reports);
    }
    Ok(())
}
