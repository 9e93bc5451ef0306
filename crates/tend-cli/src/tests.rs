use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pretty_assertions::assert_eq;
use tend_core::models::ConflictLogEntry;
use tend_core::remote::{FileRemoteStore, RemoteStore};
use tend_core::sync::SyncReport;
use tend_core::{Record, RecordId, RecordStatus, Resolution, SyncConflict};
use tokio::time::sleep;

use crate::cli::CompletionShell;
use crate::commands::common::{
    default_editor, format_relative_time, format_sync_conflict_lines, format_sync_timestamp,
    list_records, normalize_content, normalize_record_identifier, open_service, record_preview,
    resolve_record, split_title_and_description, Context,
};
use crate::commands::completions::run_completions;
use crate::commands::config::merge_config;
use crate::commands::delete::run_delete;
use crate::commands::sync::{format_sync_report, run_sync};
use crate::commands::toggle::run_set_status;
use crate::config::CliConfig;
use crate::error::CliError;

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn split_title_and_description_uses_first_line_as_title() {
    assert_eq!(
        split_title_and_description("  Buy milk\n\nTwo litres\nsemi-skimmed\n"),
        (
            "Buy milk".to_string(),
            "Two litres\nsemi-skimmed".to_string()
        )
    );
    assert_eq!(
        split_title_and_description("Only a title"),
        ("Only a title".to_string(), String::new())
    );
}

#[test]
fn normalize_record_identifier_rejects_blank_ids() {
    assert_eq!(normalize_record_identifier(" abc ").unwrap(), "abc");
    assert!(matches!(
        normalize_record_identifier("   "),
        Err(CliError::EmptyRecordId)
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn record_preview_truncates_with_ellipsis() {
    let record = Record::new("This is a very long title that should be shortened", "");
    let preview = record_preview(&record, 20);
    assert_eq!(preview, "This is a very lo...");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflicts = vec![ConflictLogEntry {
        id: 1,
        record_id: "rec-1".parse().unwrap(),
        resolved_to: Resolution::Local,
        local_updated_at: 200,
        remote_updated_at: 100,
        resolved_at: 300,
    }];

    let rendered = format_sync_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("local"));
    assert!(rendered[0].contains("record=rec-1"));
    assert!(rendered[0].contains("local=200"));
    assert!(rendered[0].contains("remote=100"));
}

#[test]
fn format_sync_report_lists_counts_and_banners() {
    let report = SyncReport {
        records: Vec::new(),
        conflicts: vec![
            SyncConflict {
                id: "a".parse().unwrap(),
                resolved_to: Resolution::Local,
            },
            SyncConflict {
                id: "b".parse().unwrap(),
                resolved_to: Resolution::Server,
            },
        ],
        pushed: 2,
        pulled: 1,
        purged: 0,
        pruned: 0,
        completed_at: 0,
    };

    assert_eq!(
        format_sync_report(&report),
        vec![
            "Sync completed: 2 pushed, 1 pulled, 0 purged".to_string(),
            "Local change synced: a".to_string(),
            "Server update applied: b".to_string(),
        ]
    );
}

#[test]
fn merge_config_prefers_explicit_values() {
    let existing = CliConfig {
        version: 1,
        remote_path: Some(PathBuf::from("/srv/old.json")),
        sync_on_mutation: Some(false),
        prune_remote_deletions: Some(true),
        remote_latency_ms: None,
    };

    let merged = merge_config(
        existing,
        Some(PathBuf::from("/srv/new.json")),
        None,
        Some(false),
        Some(250),
    );
    assert_eq!(merged.remote_path, Some(PathBuf::from("/srv/new.json")));
    assert_eq!(merged.sync_on_mutation, Some(false));
    assert_eq!(merged.prune_remote_deletions, Some(false));
    assert_eq!(merged.remote_latency_ms, Some(250));
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn list_records_respects_limit() {
    let context = test_context(false);
    {
        let service = open_service(&context).await.unwrap();
        service.create("First", "").await.unwrap();
        sleep(Duration::from_millis(2)).await;
        service.create("Second", "").await.unwrap();
        sleep(Duration::from_millis(2)).await;
        service.create("Third", "").await.unwrap();
        service.wait_idle().await;
    }

    let recent = list_records(2, &context).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].title, "Third");
    assert_eq!(recent[1].title, "Second");

    cleanup_context(&context);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn mutations_reach_the_remote_file() {
    let context = test_context(false);
    let id = {
        let service = open_service(&context).await.unwrap();
        let record = service.create("Water plants", "balcony").await.unwrap();
        service.wait_idle().await;
        record.id
    };

    run_set_status(id.as_str(), RecordStatus::Completed, &context)
        .await
        .unwrap();

    let remote = FileRemoteStore::new(&context.remote_path);
    let snapshot = remote.fetch_all().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].status, RecordStatus::Completed);

    run_delete(&id.as_str()[..8], &context).await.unwrap();
    assert!(remote.fetch_all().await.unwrap().is_empty());
    assert!(list_records(10, &context).await.unwrap().is_empty());

    cleanup_context(&context);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn offline_changes_stay_pending_until_sync() {
    let offline = test_context(true);
    {
        let service = open_service(&offline).await.unwrap();
        service.create("Offline note", "").await.unwrap();
        assert_eq!(service.pending_count().await.unwrap(), 1);
    }

    let error = run_sync(&offline).await.unwrap_err();
    assert!(matches!(error, CliError::Core(tend_core::Error::Offline)));

    let online = Context {
        offline: false,
        ..offline.clone()
    };
    run_sync(&online).await.unwrap();

    let service = open_service(&online).await.unwrap();
    assert_eq!(service.pending_count().await.unwrap(), 0);
    let remote = FileRemoteStore::new(&online.remote_path);
    assert_eq!(remote.fetch_all().await.unwrap().len(), 1);

    cleanup_context(&online);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn resolve_record_reports_ambiguous_prefix() {
    let context = test_context(true);
    let service = open_service(&context).await.unwrap();
    let first = service.create("One", "").await.unwrap();
    service.create("Two", "").await.unwrap();

    let resolved = resolve_record(first.id.as_str(), &service).await.unwrap();
    assert_eq!(resolved.id, first.id);

    let error = resolve_record(&first.id.as_str()[..4], &service)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(tend_core::Error::AmbiguousId { .. })
    ));

    let missing: RecordId = "does-not-exist".parse().unwrap();
    let error = resolve_record(missing.as_str(), &service)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Core(tend_core::Error::NotFound(_))));

    cleanup_context(&context);
}

#[test]
fn run_completions_writes_script_to_file() {
    let path = unique_test_path("completion.bash");
    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("tend"));

    let _ = std::fs::remove_file(path);
}

fn test_context(offline: bool) -> Context {
    Context {
        db_path: unique_test_path("db"),
        remote_path: unique_test_path("remote.json"),
        offline,
        config: CliConfig::default(),
    }
}

fn unique_test_path(extension: &str) -> PathBuf {
    static NEXT_TEST_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("tend-cli-test-{timestamp}-{sequence}.{extension}"))
}

fn cleanup_context(context: &Context) {
    cleanup_db_files(&context.db_path);
    let _ = std::fs::remove_file(&context.remote_path);
}

fn cleanup_db_files(path: &Path) {
    // On Windows, libsql can keep file handles alive briefly after drop.
    if cfg!(windows) {
        return;
    }

    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
}
