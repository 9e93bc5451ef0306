use tend_core::state::SyncOverview;

use crate::commands::common::{format_sync_timestamp, open_service, Context};
use crate::error::CliError;

pub async fn run_status(as_json: bool, context: &Context) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let overview = service.status().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        for line in format_status_lines(&overview, context) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(overview: &SyncOverview, context: &Context) -> Vec<String> {
    let last_sync = overview
        .last_sync_at
        .map_or_else(|| "never".to_string(), format_sync_timestamp);
    vec![
        format!("Status:    {}", overview.status),
        format!("Pending:   {}", overview.pending),
        format!("Last sync: {last_sync}"),
        format!("Database:  {}", context.db_path.display()),
        format!("Remote:    {}", context.remote_path.display()),
    ]
}
