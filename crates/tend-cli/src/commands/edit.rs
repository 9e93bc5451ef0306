use crate::commands::common::{
    capture_editor_input_with_initial, normalize_record_identifier, open_service, resolve_record,
    settle, split_title_and_description, Context,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    description: Option<String>,
    context: &Context,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let service = open_service(context).await?;
    let record = resolve_record(&normalized_id, &service).await?;

    let (new_title, new_description) = if title.is_none() && description.is_none() {
        let initial = if record.description.is_empty() {
            record.title.clone()
        } else {
            format!("{}\n\n{}", record.title, record.description)
        };
        let Some(edited) = capture_editor_input_with_initial(&initial)? else {
            return Err(CliError::EmptyTitle);
        };
        split_title_and_description(&edited)
    } else {
        (
            title.unwrap_or_else(|| record.title.clone()),
            description.unwrap_or_else(|| record.description.clone()),
        )
    };

    if new_title.trim() == record.title && new_description.trim() == record.description {
        println!("{}", record.id);
        return Ok(());
    }

    let updated = service
        .update(&record.id, &new_title, &new_description)
        .await?;
    settle(&service).await;
    println!("{}", updated.id);
    Ok(())
}
