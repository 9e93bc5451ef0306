use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use tend_core::models::ConflictLogEntry;
use tend_core::remote::FileRemoteStore;
use tend_core::services::RecordService;
use tend_core::{Record, RecordStatus};

use crate::config::CliConfig;
use crate::error::CliError;

pub type Service = RecordService<FileRemoteStore>;

/// Resolved locations and options for one CLI invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub remote_path: PathBuf,
    pub offline: bool,
    pub config: CliConfig,
}

impl Context {
    pub fn resolve(
        cli_db_path: Option<PathBuf>,
        cli_remote_path: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        Ok(Self {
            db_path: resolve_db_path(cli_db_path)?,
            remote_path: resolve_remote_path(cli_remote_path, &config)?,
            offline,
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: RecordStatus,
    pub last_updated: i64,
    pub relative_time: String,
    pub is_synced: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub record_id: String,
    pub resolved_to: String,
    pub local_updated_at: i64,
    pub remote_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
}

pub async fn open_service(context: &Context) -> Result<Service, CliError> {
    let mut remote = FileRemoteStore::new(&context.remote_path);
    if let Some(latency) = context.config.remote_latency() {
        remote = remote.with_latency(latency);
    }

    let service_config = context.config.service_config(context.offline);
    Ok(RecordService::open_path(&context.db_path, remote, service_config).await?)
}

/// Let a sync pass started by a mutation finish before the process exits.
pub async fn settle(service: &Service) {
    service.wait_idle().await;
}

pub async fn list_records(limit: usize, context: &Context) -> Result<Vec<Record>, CliError> {
    let service = open_service(context).await?;
    let mut records = service.load_all().await?;
    records.truncate(limit);
    Ok(records)
}

pub async fn list_sync_conflicts(
    limit: usize,
    context: &Context,
) -> Result<Vec<ConflictLogEntry>, CliError> {
    let service = open_service(context).await?;
    Ok(service.conflict_history(limit).await?)
}

pub async fn resolve_record(query: &str, service: &Service) -> Result<Record, CliError> {
    let id = service.resolve_id(query).await?;
    service
        .get(&id)
        .await?
        .ok_or_else(|| tend_core::Error::NotFound(id.to_string()).into())
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let short_id = short_id(record.id.as_str());
            let mark = status_mark(record.status);
            let preview = record_preview(record, 40);
            let relative_time = format_relative_time(record.last_updated, now_ms);

            if record.is_synced {
                format!("{short_id:<13}  {mark}  {preview:<40}  {relative_time}")
            } else {
                format!("{short_id:<13}  {mark}  {preview:<40}  {relative_time:<10}  (pending)")
            }
        })
        .collect()
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        id: record.id.to_string(),
        title: record.title.clone(),
        description: record.description.clone(),
        status: record.status,
        last_updated: record.last_updated,
        relative_time: format_relative_time(record.last_updated, now_ms),
        is_synced: record.is_synced,
    }
}

pub fn sync_conflict_to_item(conflict: &ConflictLogEntry) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        record_id: conflict.record_id.to_string(),
        resolved_to: conflict.resolved_to.as_str().to_string(),
        local_updated_at: conflict.local_updated_at,
        remote_updated_at: conflict.remote_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub const fn status_mark(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Pending => "[ ]",
        RecordStatus::Completed => "[x]",
    }
}

pub fn record_preview(record: &Record, max_chars: usize) -> String {
    let collapsed = record.title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_conflict_lines(conflicts: &[ConflictLogEntry]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<6}  record={}  local={} remote={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.resolved_to.as_str(),
                conflict.record_id,
                conflict.local_updated_at,
                conflict.remote_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Title and description from command arguments, piped stdin, or the editor.
pub fn resolve_record_input(
    title_parts: &[String],
    description: Option<&str>,
) -> Result<(String, String), CliError> {
    let description = description.map(str::trim).unwrap_or_default().to_string();
    if let Some(title) = normalize_content(&title_parts.join(" ")) {
        return Ok((title, description));
    }

    let captured = match read_piped_stdin()? {
        Some(content) => Some(content),
        None => capture_editor_input()?,
    };
    let Some(content) = captured else {
        return Err(CliError::EmptyTitle);
    };

    let (title, body) = split_title_and_description(&content);
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }
    if description.is_empty() {
        Ok((title, body))
    } else {
        Ok((title, description))
    }
}

/// First line is the title, the remaining text the description.
pub fn split_title_and_description(content: &str) -> (String, String) {
    let mut lines = content.trim().splitn(2, '\n');
    let title = lines.next().unwrap_or_default().trim().to_string();
    let description = lines.next().unwrap_or_default().trim().to_string();
    (title, description)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    capture_editor_input_with_initial("")
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_record_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_record_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("tend-record-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("TEND_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    data_file("tend.db")
}

pub fn resolve_remote_path(
    cli_remote_path: Option<PathBuf>,
    config: &CliConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_remote_path
        .or_else(|| env::var_os("TEND_REMOTE_PATH").map(PathBuf::from))
        .or_else(|| config.remote_path.clone())
    {
        return Ok(path);
    }
    data_file("remote.json")
}

fn data_file(name: &str) -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("tend").join(name))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}
