//! Storage configuration and path management for branchtime.
//!
//! All file paths the engine reads or writes are derived from one root
//! directory (default `~/.branchtime`). Tests and the CLI's `--data-dir` flag
//! inject a different root with [`StorageConfig::with_root`].

use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = ".branchtime";

/// Central configuration for all branchtime storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all branchtime data (default: ~/.branchtime)
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            root: home.join(DATA_DIR_NAME),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the root directory for branchtime data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to ledger.json (workspace → branch → seconds).
    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("ledger.json")
    }

    /// Path to session-marker.json (crash-recovery hint for the open session).
    pub fn marker_file(&self) -> PathBuf {
        self.root.join("session-marker.json")
    }

    /// Path to config.toml (tracker tunables).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to logs/ directory (rolling host logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_root_derives_all_paths() {
        let storage = StorageConfig::with_root(PathBuf::from("/data/bt"));
        assert_eq!(storage.root(), Path::new("/data/bt"));
        assert_eq!(storage.ledger_file(), PathBuf::from("/data/bt/ledger.json"));
        assert_eq!(
            storage.marker_file(),
            PathBuf::from("/data/bt/session-marker.json")
        );
        assert_eq!(storage.config_file(), PathBuf::from("/data/bt/config.toml"));
        assert_eq!(storage.logs_dir(), PathBuf::from("/data/bt/logs"));
    }

    #[test]
    fn test_default_root_is_hidden_dir() {
        let storage = StorageConfig::default();
        assert!(storage.root().ends_with(DATA_DIR_NAME));
    }
}
