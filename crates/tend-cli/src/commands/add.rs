use crate::commands::common::{open_service, resolve_record_input, settle, Context};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    description: Option<&str>,
    context: &Context,
) -> Result<(), CliError> {
    let (title, description) = resolve_record_input(title_parts, description)?;

    let service = open_service(context).await?;
    let record = service.create(&title, &description).await?;
    settle(&service).await;

    println!("{}", record.id);
    Ok(())
}
