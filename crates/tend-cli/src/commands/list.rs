use crate::commands::common::{
    format_record_lines, list_records, record_to_list_item, Context, RecordListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, context: &Context) -> Result<(), CliError> {
    let records = list_records(limit, context).await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No records yet.");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
