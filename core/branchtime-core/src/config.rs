//! Tracker tunables, loaded from `config.toml` in the storage root.
//!
//! ```toml
//! idle_timeout_secs = 300
//! recovery_max_age_secs = 600
//! branch_check_interval_secs = 5
//! git_command = "git"
//! ```
//!
//! Every key is optional. A missing file yields [`TrackerConfig::default`].

use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, TrackerError};

const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RECOVERY_MAX_AGE_SECS: u64 = 600;
const DEFAULT_BRANCH_CHECK_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Inactivity after which an open session is auto-closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Maximum age of a session marker that may be resumed after restart.
    #[serde(default = "default_recovery_max_age_secs")]
    pub recovery_max_age_secs: u64,
    /// Minimum spacing between branch lookups triggered by activity. 0 = every signal.
    #[serde(default = "default_branch_check_interval_secs")]
    pub branch_check_interval_secs: u64,
    /// Executable used to query the current branch.
    #[serde(default = "default_git_command")]
    pub git_command: String,
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_recovery_max_age_secs() -> u64 {
    DEFAULT_RECOVERY_MAX_AGE_SECS
}

fn default_branch_check_interval_secs() -> u64 {
    DEFAULT_BRANCH_CHECK_INTERVAL_SECS
}

fn default_git_command() -> String {
    "git".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            recovery_max_age_secs: default_recovery_max_age_secs(),
            branch_check_interval_secs: default_branch_check_interval_secs(),
            git_command: default_git_command(),
        }
    }
}

impl TrackerConfig {
    /// Idle window in milliseconds. Never zero: a zero timeout would close
    /// every session the instant it opened.
    pub fn idle_timeout_ms(&self) -> i64 {
        secs_to_millis(self.idle_timeout_secs.max(1))
    }

    pub fn recovery_max_age_ms(&self) -> i64 {
        secs_to_millis(self.recovery_max_age_secs)
    }

    pub fn branch_check_interval_ms(&self) -> i64 {
        secs_to_millis(self.branch_check_interval_secs)
    }
}

fn secs_to_millis(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

/// Loads the tracker configuration, returning defaults if the file doesn't exist.
pub fn load_tracker_config(path: &Path) -> Result<TrackerConfig> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(TrackerConfig::default())
        }
        Err(err) => return Err(TrackerError::io("Failed to read tracker config", err)),
    };

    toml::from_str::<TrackerConfig>(&content).map_err(|err| TrackerError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
