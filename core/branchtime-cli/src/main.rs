//! branchtime: command-line host for the branch time tracker.
//!
//! ## Subcommands
//!
//! - `watch`: Routes signals read from stdin into the engine until EOF
//! - `summary`: Per-branch totals for a workspace
//! - `export`: JSON snapshot of a workspace's totals
//! - `clear`: Drops a workspace's ledger entries
//! - `identity` / `branch`: Show how a project root is identified and what it has checked out

mod error;
mod logging;
mod report;
mod watch;

use branchtime_core::StorageConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "branchtime")]
#[command(about = "Tracks active time per git branch")]
#[command(version)]
struct Cli {
    /// Data directory (default: ~/.branchtime)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Selects a workspace either by project root or by its identity string.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Project root (default: current directory)
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Workspace identity, as printed by `branchtime identity`
    #[arg(long, value_name = "ID", conflicts_with = "root")]
    workspace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a project, reading one signal per line from stdin
    /// (activity, focus-gained, focus-lost, start, stop, quit)
    Watch {
        /// Project root (default: current directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },

    /// Show time per branch
    Summary {
        #[command(flatten)]
        target: Target,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export a JSON snapshot of time per branch
    Export {
        #[command(flatten)]
        target: Target,

        /// Write to a file instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Remove all tracked time for a workspace
    Clear {
        #[command(flatten)]
        target: Target,

        /// Confirm the irreversible clear
        #[arg(long)]
        yes: bool,
    },

    /// Print the workspace identity of a project root
    Identity {
        /// Project root (default: current directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },

    /// Print the branch currently checked out under a project root
    Branch {
        /// Project root (default: current directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .data_dir
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let _logging_guard = logging::init(&storage);

    if let Err(e) = run(cli.command, storage) {
        tracing::error!(error = %e, "branchtime command failed");
        eprintln!("branchtime: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, storage: StorageConfig) -> Result<(), CliError> {
    match command {
        Commands::Watch { root } => watch::run(&resolve_root(root)?, storage),
        Commands::Summary { target, json } => report::summary(&target, storage, json),
        Commands::Export { target, output } => report::export(&target, storage, output.as_deref()),
        Commands::Clear { target, yes } => report::clear(&target, storage, yes),
        Commands::Identity { root } => report::identity(&resolve_root(root)?),
        Commands::Branch { root } => report::branch(&resolve_root(root)?, &storage),
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match root {
        Some(root) => Ok(root),
        None => Ok(std::env::current_dir()?),
    }
}

impl Target {
    pub fn root(&self) -> Result<PathBuf, CliError> {
        resolve_root(self.root.clone())
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }
}
