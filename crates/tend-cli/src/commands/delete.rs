use crate::commands::common::{
    normalize_record_identifier, open_service, resolve_record, settle, Context,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &Context) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let service = open_service(context).await?;
    let record = resolve_record(&normalized_id, &service).await?;

    service.delete(&record.id).await?;
    settle(&service).await;
    println!("{}", record.id);
    Ok(())
}
