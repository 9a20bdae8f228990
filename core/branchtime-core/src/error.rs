//! Error types for branchtime-core operations.
//!
//! Nothing in the tracking path turns one of these into a panic: the tracker
//! logs them and degrades to "tracking paused".

use std::path::PathBuf;

/// All errors that can occur in branchtime-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    // ─────────────────────────────────────────────────────────────────────
    // Branch Resolution Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Not a version-control repository: {0}")]
    NotARepository(PathBuf),

    #[error("Repository is in detached HEAD state: {0}")]
    DetachedHead(PathBuf),

    #[error("Branch resolution failed: {root}: {details}")]
    BranchResolution { root: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Ledger Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Workspace not found in ledger: {0}")]
    WorkspaceNotFound(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TrackerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TrackerError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        TrackerError::Json {
            context: context.into(),
            source,
        }
    }

    /// True for errors that mean "this root will never resolve a branch",
    /// as opposed to transient failures that the next signal may clear.
    pub fn is_not_a_repository(&self) -> bool {
        matches!(self, TrackerError::NotARepository(_))
    }
}

/// Convenience type alias for Results using TrackerError.
pub type Result<T> = std::result::Result<T, TrackerError>;

// Conversion for string error compatibility
impl From<TrackerError> for String {
    fn from(err: TrackerError) -> String {
        err.to_string()
    }
}
