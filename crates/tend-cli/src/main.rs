//! tend CLI - Track records offline and sync them with a shared remote
//!
//! Every change lands in the local database first; a sync pass reconciles
//! it with the remote store using last-write-wins.

mod cli;
mod commands;
mod config;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tend_core::RecordStatus;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_sync_clear, run_sync_conflicts};
use crate::commands::toggle::run_set_status;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell, output }) => {
            return run_completions(shell, output.as_deref());
        }
        Some(Commands::Config { command }) => return run_config(command),
        _ => {}
    }

    let context = Context::resolve(cli.db_path, cli.remote_path, cli.offline)?;

    match cli.command {
        Some(Commands::Add { title, description }) => {
            run_add(&title, description.as_deref(), &context).await?;
        }
        Some(Commands::List { limit, json }) => run_list(limit, json, &context).await?,
        Some(Commands::Edit {
            id,
            title,
            description,
        }) => run_edit(&id, title, description, &context).await?,
        Some(Commands::Done { id }) => {
            run_set_status(&id, RecordStatus::Completed, &context).await?;
        }
        Some(Commands::Undo { id }) => {
            run_set_status(&id, RecordStatus::Pending, &context).await?;
        }
        Some(Commands::Delete { id }) => run_delete(&id, &context).await?,
        Some(Commands::Sync { command }) => match command {
            None => run_sync(&context).await?,
            Some(SyncCommands::Conflicts { limit, json }) => {
                run_sync_conflicts(limit, json, &context).await?;
            }
            Some(SyncCommands::Clear) => run_sync_clear(&context).await?,
        },
        Some(Commands::Status { json }) => run_status(json, &context).await?,
        Some(Commands::Completions { .. } | Commands::Config { .. }) => {}
        None => {
            // Quick capture mode: tend "buy milk"
            if cli.title.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.title, None, &context).await?;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tend=info".parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
