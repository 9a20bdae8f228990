//! Persisted session marker: the crash-recovery hint for the open session.
//!
//! Written whenever a session starts and removed whenever it stops, so a
//! marker found at startup means the previous process died while tracking.
//!
//! ```json
//! { "branch": "main", "startedAtEpochMillis": 1767225600000, "workspaceId": "app-3f2a9c01b7de" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::ledger::write_atomically;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    pub branch: String,
    pub started_at_epoch_millis: i64,
    pub workspace_id: String,
}

/// Holds at most one marker, mirrored to a single file when file-backed.
#[derive(Debug)]
pub struct MarkerStore {
    current: Option<SessionMarker>,
    file_path: Option<PathBuf>,
}

impl MarkerStore {
    pub fn new_in_memory() -> Self {
        MarkerStore {
            current: None,
            file_path: None,
        }
    }

    /// Reads the marker file. Unreadable or corrupt markers are treated as absent.
    pub fn load(file_path: &Path) -> Self {
        let current = match fs_err::read_to_string(file_path) {
            Ok(content) if content.trim().is_empty() => None,
            Ok(content) => match serde_json::from_str::<SessionMarker>(&content) {
                Ok(marker) => Some(marker),
                Err(err) => {
                    warn!(
                        path = %file_path.display(),
                        error = %err,
                        "Ignoring corrupt session marker"
                    );
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(error = %err, "Failed to read session marker");
                None
            }
        };

        MarkerStore {
            current,
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn current(&self) -> Option<&SessionMarker> {
        self.current.as_ref()
    }

    /// Replaces the marker. Memory is updated before the write is attempted.
    pub fn save(&mut self, marker: SessionMarker) -> Result<()> {
        let content = serde_json::to_string_pretty(&marker)
            .map_err(|e| TrackerError::json("Failed to serialize session marker", e))?;
        self.current = Some(marker);

        match self.file_path.as_ref() {
            Some(path) => write_atomically(path, content.as_bytes()),
            None => Ok(()),
        }
    }

    pub fn clear(&mut self) -> Result<()> {
        self.current = None;

        let Some(path) = self.file_path.as_ref() else {
            return Ok(());
        };
        match fs_err::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(TrackerError::io("Failed to remove session marker", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> SessionMarker {
        SessionMarker {
            branch: "main".to_string(),
            started_at_epoch_millis: 1_767_225_600_000,
            workspace_id: "app-3f2a9c01b7de".to_string(),
        }
    }

    #[test]
    fn save_and_reload_round_trips_through_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("session-marker.json");

        let mut store = MarkerStore::load(&path);
        assert!(store.current().is_none());
        store.save(marker()).unwrap();

        let reloaded = MarkerStore::load(&path);
        assert_eq!(reloaded.current(), Some(&marker()));
    }

    #[test]
    fn serialized_field_names_are_camel_case() {
        let json = serde_json::to_value(marker()).unwrap();
        assert_eq!(json["startedAtEpochMillis"], 1_767_225_600_000_i64);
        assert_eq!(json["workspaceId"], "app-3f2a9c01b7de");
        assert_eq!(json["branch"], "main");
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("session-marker.json");

        let mut store = MarkerStore::load(&path);
        store.save(marker()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.current().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_marker_is_treated_as_absent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("session-marker.json");
        std::fs::write(&path, "{\"branch\": 3}").unwrap();

        assert!(MarkerStore::load(&path).current().is_none());
    }
}
