//! Startup recovery: resume or discard a session left open by a previous process.
//!
//! A marker younger than the recovery window is resumed with its original
//! start time, so a quick restart does not split (or lose) the session. Older
//! markers represent real downtime and are discarded.

use tracing::{info, warn};

use crate::marker::{MarkerStore, SessionMarker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeDecision {
    Resume { branch: String, started_at_ms: i64 },
    NoResume(NoResumeReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoResumeReason {
    NoMarker,
    OtherWorkspace,
    /// Marker age reached the recovery window.
    Stale,
    /// Marker claims to start after `now` (clock moved backwards).
    FutureTimestamp,
}

impl NoResumeReason {
    /// Whether the marker that produced this reason should be deleted.
    pub fn clears_marker(self) -> bool {
        !matches!(self, NoResumeReason::NoMarker)
    }
}

/// Pure resume decision. `age < max_age_ms` resumes; exactly `max_age_ms` does not.
pub fn recover(
    current_workspace: &str,
    marker: Option<&SessionMarker>,
    now_ms: i64,
    max_age_ms: i64,
) -> ResumeDecision {
    let Some(marker) = marker else {
        return ResumeDecision::NoResume(NoResumeReason::NoMarker);
    };

    if marker.workspace_id != current_workspace {
        return ResumeDecision::NoResume(NoResumeReason::OtherWorkspace);
    }

    let age = now_ms - marker.started_at_epoch_millis;
    if age < 0 {
        return ResumeDecision::NoResume(NoResumeReason::FutureTimestamp);
    }
    if age >= max_age_ms {
        return ResumeDecision::NoResume(NoResumeReason::Stale);
    }

    ResumeDecision::Resume {
        branch: marker.branch.clone(),
        started_at_ms: marker.started_at_epoch_millis,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecoveryManager {
    max_age_ms: i64,
}

impl RecoveryManager {
    pub fn new(max_age_ms: i64) -> Self {
        Self { max_age_ms }
    }

    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// Decides against the stored marker and clears it when it is not resumable.
    pub fn apply(
        &self,
        current_workspace: &str,
        markers: &mut MarkerStore,
        now_ms: i64,
    ) -> ResumeDecision {
        let decision = recover(current_workspace, markers.current(), now_ms, self.max_age_ms);

        match &decision {
            ResumeDecision::Resume {
                branch,
                started_at_ms,
            } => {
                info!(
                    workspace = %current_workspace,
                    branch = %branch,
                    age_ms = now_ms - started_at_ms,
                    "Resuming session from marker"
                );
            }
            ResumeDecision::NoResume(reason) if reason.clears_marker() => {
                info!(
                    workspace = %current_workspace,
                    reason = ?reason,
                    "Discarding session marker"
                );
                if let Err(err) = markers.clear() {
                    warn!(error = %err, "Failed to clear session marker");
                }
            }
            ResumeDecision::NoResume(_) => {}
        }

        decision
    }
}
