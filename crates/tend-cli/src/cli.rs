use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tend")]
#[command(about = "Track records offline and sync them when you can")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the remote store file
    #[arg(long, global = true, value_name = "PATH")]
    pub remote_path: Option<PathBuf>,

    /// Work offline: keep changes local and skip syncing
    #[arg(long, global = true)]
    pub offline: bool,

    /// Quick capture: tend "buy milk"
    #[arg(trailing_var_arg = true)]
    pub title: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new record
    #[command(alias = "new")]
    Add {
        /// Record title
        title: Vec<String>,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List records
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing record (opens $EDITOR without flags)
    Edit {
        /// Record ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Mark a record completed
    Done {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Mark a record pending again
    Undo {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Delete an existing record
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Reconcile local records with the remote store
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Show sync status and pending changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI defaults
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget recorded sync conflicts
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Remote store file shared between devices
        #[arg(long, value_name = "PATH")]
        remote_path: Option<PathBuf>,
        /// Sync after every change (true/false)
        #[arg(long, value_name = "BOOL")]
        sync_on_mutation: Option<bool>,
        /// Remove synced records the remote no longer has (true/false)
        #[arg(long, value_name = "BOOL")]
        prune_remote_deletions: Option<bool>,
        /// Simulated remote latency in milliseconds
        #[arg(long, value_name = "MS")]
        remote_latency_ms: Option<u64>,
    },
    /// Print the effective configuration
    Show,
}
