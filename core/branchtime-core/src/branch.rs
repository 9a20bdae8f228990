//! Branch resolution.
//!
//! The tracker only needs "what branch is checked out under this root?", so
//! the capability is a trait. [`GitBranchResolver`] answers it by asking git;
//! tests substitute an in-memory source.
//!
//! The resolver never caches: a branch switch must be visible on the next
//! signal. Throttling, when wanted, lives in the tracker.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, TrackerError};

pub trait BranchSource {
    fn resolve_branch(&self, project_root: &Path) -> Result<String>;
}

impl<T: BranchSource + ?Sized> BranchSource for &T {
    fn resolve_branch(&self, project_root: &Path) -> Result<String> {
        (**self).resolve_branch(project_root)
    }
}

impl<T: BranchSource + ?Sized> BranchSource for Box<T> {
    fn resolve_branch(&self, project_root: &Path) -> Result<String> {
        (**self).resolve_branch(project_root)
    }
}

/// Resolves the current branch by running `git symbolic-ref --short -q HEAD`.
#[derive(Debug, Clone)]
pub struct GitBranchResolver {
    git_command: String,
}

impl Default for GitBranchResolver {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitBranchResolver {
    pub fn new(git_command: impl Into<String>) -> Self {
        Self {
            git_command: git_command.into(),
        }
    }
}

impl BranchSource for GitBranchResolver {
    fn resolve_branch(&self, project_root: &Path) -> Result<String> {
        // `.git` is a directory in a normal checkout and a file in worktrees/submodules.
        if !project_root.join(".git").exists() {
            return Err(TrackerError::NotARepository(project_root.to_path_buf()));
        }

        let output = Command::new(&self.git_command)
            .current_dir(project_root)
            .args(["symbolic-ref", "--short", "-q", "HEAD"])
            .output()
            .map_err(|err| TrackerError::BranchResolution {
                root: project_root.to_path_buf(),
                details: format!("failed to run {}: {}", self.git_command, err),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            // -q: exit 1 with no output means HEAD is not a symbolic ref.
            if output.status.code() == Some(1) && stdout.is_empty() {
                return Err(TrackerError::DetachedHead(project_root.to_path_buf()));
            }
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TrackerError::BranchResolution {
                root: project_root.to_path_buf(),
                details: format!("{} exited with {}: {}", self.git_command, output.status, stderr),
            });
        }

        if stdout.is_empty() {
            return Err(TrackerError::BranchResolution {
                root: project_root.to_path_buf(),
                details: "empty branch name".to_string(),
            });
        }

        debug!(root = %project_root.display(), branch = %stdout, "Resolved branch");
        Ok(stdout)
    }
}
