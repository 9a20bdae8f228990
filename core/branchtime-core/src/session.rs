use serde::Serialize;

use crate::marker::SessionMarker;

/// One contiguous interval of attributed activity on a (workspace, branch) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub workspace: String,
    pub branch: String,
    pub started_at_ms: i64,
}

impl Session {
    /// Whole seconds between start and `end_ms`, rounded down. Never negative.
    pub fn elapsed_secs(&self, end_ms: i64) -> u64 {
        let elapsed_ms = end_ms.saturating_sub(self.started_at_ms).max(0);
        (elapsed_ms / 1000) as u64
    }

    pub fn to_marker(&self) -> SessionMarker {
        SessionMarker {
            branch: self.branch.clone(),
            started_at_epoch_millis: self.started_at_ms,
            workspace_id: self.workspace.clone(),
        }
    }
}
