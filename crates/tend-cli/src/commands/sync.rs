use tend_core::sync::SyncReport;

use crate::commands::common::{
    format_sync_conflict_lines, list_sync_conflicts, open_service, sync_conflict_to_item,
    Context, SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(context: &Context) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let report = service.run_sync().await?;

    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync completed: {} pushed, {} pulled, {} purged",
        report.pushed, report.pulled, report.purged
    )];
    if report.pruned > 0 {
        lines.push(format!(
            "Removed {} record(s) no longer on the remote",
            report.pruned
        ));
    }
    lines.extend(
        report
            .conflicts
            .iter()
            .map(|conflict| format!("{}: {}", conflict.resolved_to.banner(), conflict.id)),
    );
    lines
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let conflicts = list_sync_conflicts(limit, context).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_sync_clear(context: &Context) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let cleared = service.clear_conflicts().await?;
    println!("Cleared {cleared} sync conflict(s)");
    Ok(())
}
