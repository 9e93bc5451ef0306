use std::path::PathBuf;

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            remote_path,
            sync_on_mutation,
            prune_remote_deletions,
            remote_latency_ms,
        } => run_config_init(
            remote_path,
            sync_on_mutation,
            prune_remote_deletions,
            remote_latency_ms,
        ),
        ConfigCommands::Show => run_config_show(),
    }
}

pub fn run_config_init(
    remote_path: Option<PathBuf>,
    sync_on_mutation: Option<bool>,
    prune_remote_deletions: Option<bool>,
    remote_latency_ms: Option<u64>,
) -> Result<(), CliError> {
    let existing = CliConfig::load().map_err(CliError::Config)?;
    let config = merge_config(
        existing,
        remote_path,
        sync_on_mutation,
        prune_remote_deletions,
        remote_latency_ms,
    );

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved CLI config to {}", path.display());
    Ok(())
}

/// Explicit values win over what the config file already holds.
pub fn merge_config(
    existing: CliConfig,
    remote_path: Option<PathBuf>,
    sync_on_mutation: Option<bool>,
    prune_remote_deletions: Option<bool>,
    remote_latency_ms: Option<u64>,
) -> CliConfig {
    CliConfig {
        version: 1,
        remote_path: remote_path.or(existing.remote_path),
        sync_on_mutation: sync_on_mutation.or(existing.sync_on_mutation),
        prune_remote_deletions: prune_remote_deletions.or(existing.prune_remote_deletions),
        remote_latency_ms: remote_latency_ms.or(existing.remote_latency_ms),
    }
}

pub fn run_config_show() -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    let config = CliConfig::load_from_path(&path).map_err(CliError::Config)?;
    let service = config.service_config(false);

    println!("Config file:            {}", path.display());
    println!(
        "Remote path:            {}",
        config
            .remote_path
            .as_ref()
            .map_or_else(|| "(default)".to_string(), |path| path.display().to_string())
    );
    println!("Sync on mutation:       {}", service.sync_on_mutation);
    println!("Prune remote deletions: {}", service.prune_remote_deletions);
    println!(
        "Remote latency:         {}",
        config
            .remote_latency_ms
            .map_or_else(|| "none".to_string(), |ms| format!("{ms} ms"))
    );
    Ok(())
}
