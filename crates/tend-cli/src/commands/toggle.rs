use tend_core::RecordStatus;

use crate::commands::common::{
    normalize_record_identifier, open_service, resolve_record, settle, Context,
};
use crate::error::CliError;

/// Set a record's status, printing its id. Already matching records are left untouched.
pub async fn run_set_status(
    id: &str,
    status: RecordStatus,
    context: &Context,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let service = open_service(context).await?;
    let record = resolve_record(&normalized_id, &service).await?;

    if record.status != status {
        service.toggle_status(&record.id, status).await?;
        settle(&service).await;
    }

    println!("{}", record.id);
    Ok(())
}
