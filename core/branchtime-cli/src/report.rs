//! One-shot commands over the ledger: summary, export, clear, identity, branch.
//!
//! "Nothing tracked" and "not a repository" are answers, not failures: they
//! print an empty state and exit 0.

use std::path::Path;

use branchtime_core::{
    format_duration, load_tracker_config, BranchSource, BranchTotals, GitBranchResolver,
    StorageConfig, TrackerConfig, TrackerEngine, TrackerError, WorkspaceIdentity,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CliError;
use crate::Target;

#[derive(Serialize)]
struct SummaryJson<'a> {
    workspace: &'a str,
    branches: &'a BranchTotals,
    total_seconds: u64,
}

/// Opens an engine for the target and returns it with the workspace id to query.
fn open(target: &Target, storage: StorageConfig) -> Result<(TrackerEngine, String), CliError> {
    let root = target.root()?;
    let engine = TrackerEngine::with_storage(&root, storage);
    let workspace = match target.workspace() {
        Some(id) => id.to_string(),
        None => engine.workspace().to_string(),
    };
    Ok((engine, workspace))
}

pub fn summary(target: &Target, storage: StorageConfig, json: bool) -> Result<(), CliError> {
    let (engine, workspace) = open(target, storage)?;
    let totals = engine.get_workspace_summary(&workspace);
    let total_seconds = totals
        .values()
        .fold(0u64, |acc, &secs| acc.saturating_add(secs));

    if json {
        let payload = SummaryJson {
            workspace: &workspace,
            branches: &totals,
            total_seconds,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print!("{}", render_summary(&workspace, &totals, total_seconds));
    Ok(())
}

fn render_summary(workspace: &str, totals: &BranchTotals, total_seconds: u64) -> String {
    if totals.is_empty() {
        return format!("No time tracked yet for {}.\n", workspace);
    }

    let mut rows: Vec<(&String, &u64)> = totals.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let width = rows
        .iter()
        .map(|(branch, _)| branch.chars().count())
        .max()
        .unwrap_or(0)
        .max("Total".len());

    let mut out = format!("Workspace: {}\n", workspace);
    for (branch, secs) in rows {
        out.push_str(&format!(
            "  {:<width$}  {:>12}\n",
            branch,
            format_duration(*secs),
            width = width
        ));
    }
    out.push_str(&format!(
        "  {:<width$}  {:>12}\n",
        "Total",
        format_duration(total_seconds),
        width = width
    ));
    out
}

pub fn export(
    target: &Target,
    storage: StorageConfig,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let (engine, workspace) = open(target, storage)?;
    let snapshot = engine.export_snapshot(&workspace);
    let content = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some(path) => {
            fs_err::write(path, format!("{}\n", content))?;
            info!(workspace = %workspace, path = %path.display(), "Exported snapshot");
            println!("Exported {} to {}", workspace, path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub fn clear(target: &Target, storage: StorageConfig, confirmed: bool) -> Result<(), CliError> {
    let (mut engine, workspace) = open(target, storage)?;
    if target.workspace().is_some() && !engine.known_workspaces().contains(&workspace) {
        return Err(TrackerError::WorkspaceNotFound(workspace).into());
    }
    if !confirmed {
        return Err(CliError::ConfirmationRequired(workspace));
    }

    if engine.clear_workspace(&workspace)? {
        println!("Cleared {}", workspace);
    } else {
        println!("Nothing to clear for {}", workspace);
    }
    Ok(())
}

pub fn identity(root: &Path) -> Result<(), CliError> {
    println!("{}", WorkspaceIdentity::from_root(root));
    Ok(())
}

pub fn branch(root: &Path, storage: &StorageConfig) -> Result<(), CliError> {
    let config = load_tracker_config(&storage.config_file()).unwrap_or_else(|err| {
        warn!(error = %err, "Failed to load tracker config; using defaults");
        TrackerConfig::default()
    });
    let resolver = GitBranchResolver::new(config.git_command);

    match resolver.resolve_branch(root) {
        Ok(branch) => println!("{}", branch),
        Err(TrackerError::NotARepository(path)) => {
            println!("No branch: not a repository ({})", path.display())
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
