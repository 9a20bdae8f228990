//! File-backed time ledger.
//!
//! Accumulated seconds per branch, grouped by workspace. The file is shared by
//! every engine using the same data directory, so `commit` and `clear` re-read
//! it and apply only their own change before writing it back. Entries written
//! by other engines since this one loaded survive.
//!
//! # File Format
//!
//! ```json
//! {
//!   "assistant-ui-3f2a9c01b7de": {
//!     "main": 3600,
//!     "feature/login": 812
//!   }
//! }
//! ```
//!
//! # Defensive Loading
//!
//! A ledger that cannot be read is treated as empty so tracking can start:
//! - Missing file (first run)
//! - Empty file
//! - Corrupt JSON (logged)
//!
//! # Atomic Writes
//!
//! Uses temp file + rename so a crash mid-write never leaves a truncated ledger.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};

/// Branch name → accumulated seconds for one workspace.
pub type BranchTotals = BTreeMap<String, u64>;

/// The on-disk JSON structure for the ledger file.
type LedgerFile = BTreeMap<String, BranchTotals>;

/// In-memory ledger, optionally backed by a file.
///
/// Create with [`Ledger::load`] to read from the ledger file,
/// or [`Ledger::new_in_memory`] for tests.
#[derive(Debug)]
pub struct Ledger {
    workspaces: HashMap<String, BranchTotals>,
    file_path: Option<PathBuf>,
}

impl Ledger {
    pub fn new_in_memory() -> Self {
        Ledger {
            workspaces: HashMap::new(),
            file_path: None,
        }
    }

    pub fn new(file_path: &Path) -> Self {
        Ledger {
            workspaces: HashMap::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    /// Loads the ledger file. Never fails: unreadable state yields an empty ledger.
    pub fn load(file_path: &Path) -> Self {
        match read_ledger_file(file_path) {
            Some(file) => Ledger {
                workspaces: file.into_iter().collect(),
                file_path: Some(file_path.to_path_buf()),
            },
            None => Ledger::new(file_path),
        }
    }

    /// Replaces the in-memory view with the file's current contents. An
    /// unusable file keeps the in-memory view as the base for the next write.
    fn refresh(&mut self) {
        let Some(file_path) = self.file_path.as_ref() else {
            return;
        };
        if let Some(file) = read_ledger_file(file_path) {
            self.workspaces = file.into_iter().collect();
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file: LedgerFile = self
            .workspaces
            .iter()
            .filter(|(_, totals)| !totals.is_empty())
            .map(|(workspace, totals)| (workspace.clone(), totals.clone()))
            .collect();

        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| TrackerError::json("Failed to serialize ledger", e))?;

        write_atomically(file_path, content.as_bytes())
    }

    /// Branch totals for one workspace; empty when the workspace is unknown.
    pub fn get(&self, workspace: &str) -> BranchTotals {
        self.workspaces.get(workspace).cloned().unwrap_or_default()
    }

    /// Adds `seconds` to the (workspace, branch) total and persists the ledger.
    ///
    /// The increment is applied on top of the file as it is now, not as it was
    /// at load time. The in-memory total advances even when the write fails;
    /// the error is returned so the caller can report the lost increment.
    pub fn commit(&mut self, workspace: &str, branch: &str, seconds: u64) -> Result<u64> {
        self.refresh();
        let total = self
            .workspaces
            .entry(workspace.to_string())
            .or_default()
            .entry(branch.to_string())
            .or_default();
        *total = total.saturating_add(seconds);
        let new_total = *total;

        debug!(
            workspace = %workspace,
            branch = %branch,
            seconds,
            total = new_total,
            "Committed tracked time"
        );

        self.save()?;
        Ok(new_total)
    }

    /// Removes every branch entry for one workspace. Returns whether anything was removed.
    pub fn clear(&mut self, workspace: &str) -> Result<bool> {
        self.refresh();
        let removed = self.workspaces.remove(workspace).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Known workspace ids, sorted.
    pub fn workspaces(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .workspaces
            .iter()
            .filter(|(_, totals)| !totals.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Reads the ledger file. A missing or blank file is an empty ledger; `None`
/// means the file exists but cannot be read or parsed.
fn read_ledger_file(file_path: &Path) -> Option<LedgerFile> {
    let content = match fs_err::read_to_string(file_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Some(LedgerFile::new()),
        Err(err) => {
            warn!(error = %err, "Failed to read ledger");
            return None;
        }
    };

    if content.trim().is_empty() {
        debug!(path = %file_path.display(), "Empty ledger file");
        return Some(LedgerFile::new());
    }

    match serde_json::from_str::<LedgerFile>(&content) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(
                path = %file_path.display(),
                error = %err,
                "Failed to parse ledger"
            );
            None
        }
    }
}

/// Writes `bytes` to `path` via a temp file in the same directory plus rename.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent_dir = path.parent().ok_or_else(|| {
        TrackerError::io(
            format!("{} has no parent directory", path.display()),
            std::io::Error::from(std::io::ErrorKind::InvalidInput),
        )
    })?;
    fs_err::create_dir_all(parent_dir)
        .map_err(|e| TrackerError::io("Failed to create storage directory", e))?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .map_err(|e| TrackerError::io("Failed to create temp file", e))?;
    temp_file
        .write_all(bytes)
        .map_err(|e| TrackerError::io("Failed to write temp file", e))?;
    temp_file
        .flush()
        .map_err(|e| TrackerError::io("Failed to flush temp file", e))?;
    temp_file
        .persist(path)
        .map_err(|e| TrackerError::io(format!("Failed to replace {}", path.display()), e.error))?;

    Ok(())
}
