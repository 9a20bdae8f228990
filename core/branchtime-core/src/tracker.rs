//! Session state machine.
//!
//! ```text
//!                activity / focus-gained (branch resolved)
//!     ┌──────┐ ─────────────────────────────────────────▶ ┌──────────────────────┐
//!     │ Idle │                                            │ Tracking(branch, t0) │ ─┐ activity, other branch:
//!     └──────┘ ◀───────────────────────────────────────── └──────────────────────┘ ◀┘ commit + restart
//!                focus-lost / idle deadline / stop / shutdown (commit)
//! ```
//!
//! Every stop commits `floor((end - t0) / 1000)` seconds to the ledger and
//! removes the session marker. Signals are handled one at a time through
//! `&mut self`; hosts that receive them concurrently must serialize them.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::branch::BranchSource;
use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::identity::WorkspaceIdentity;
use crate::ledger::Ledger;
use crate::marker::MarkerStore;
use crate::session::Session;

/// Outcome of one signal, for callers that want to react or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Started {
        branch: String,
    },
    Switched {
        from: String,
        to: String,
        committed_secs: u64,
    },
    /// Same branch as the open session; only the idle deadline moved.
    Continued {
        branch: String,
    },
    Stopped {
        branch: String,
        committed_secs: u64,
        reason: StopReason,
    },
    /// Nothing changed (no session to stop, branch unresolvable, stale wake).
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FocusLost,
    IdleTimeout,
    Explicit,
    Shutdown,
}

pub struct SessionTracker<B, C> {
    workspace: WorkspaceIdentity,
    project_root: PathBuf,
    branches: B,
    clock: C,
    ledger: Ledger,
    markers: MarkerStore,
    idle_timeout_ms: i64,
    branch_check_interval_ms: i64,
    session: Option<Session>,
    idle_deadline: Option<i64>,
    last_branch_check_ms: Option<i64>,
    repo_missing_reported: bool,
}

impl<B: BranchSource, C: Clock> SessionTracker<B, C> {
    pub fn new(
        project_root: &Path,
        config: &TrackerConfig,
        branches: B,
        clock: C,
        ledger: Ledger,
        markers: MarkerStore,
    ) -> Self {
        Self {
            workspace: WorkspaceIdentity::from_root(project_root),
            project_root: project_root.to_path_buf(),
            branches,
            clock,
            ledger,
            markers,
            idle_timeout_ms: config.idle_timeout_ms(),
            branch_check_interval_ms: config.branch_check_interval_ms(),
            session: None,
            idle_deadline: None,
            last_branch_check_ms: None,
            repo_missing_reported: false,
        }
    }

    pub fn workspace(&self) -> &WorkspaceIdentity {
        &self.workspace
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Epoch millis at which the open session auto-closes, if tracking.
    pub fn idle_deadline(&self) -> Option<i64> {
        self.idle_deadline
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    pub(crate) fn markers_mut(&mut self) -> &mut MarkerStore {
        &mut self.markers
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_millis()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Signals
    // ─────────────────────────────────────────────────────────────────────────────

    /// Coarse "the user did something" signal. Branch lookups are throttled
    /// while a session is open.
    pub fn on_activity(&mut self) -> Transition {
        self.handle_signal(false)
    }

    /// Focus returned to the host; always re-resolves the branch.
    pub fn on_focus_gained(&mut self) -> Transition {
        self.handle_signal(true)
    }

    pub fn on_focus_lost(&mut self) -> Transition {
        let now = self.clock.now_millis();
        self.stop_at(now, StopReason::FocusLost)
    }

    /// Scheduled wake for the idle deadline. Wakes that arrive before the
    /// current deadline belong to a superseded schedule and do nothing.
    pub fn on_idle_timeout(&mut self) -> Transition {
        let now = self.clock.now_millis();
        match self.idle_deadline {
            Some(deadline) if now >= deadline => self.stop_at(now, StopReason::IdleTimeout),
            _ => Transition::Ignored,
        }
    }

    pub fn stop(&mut self, reason: StopReason) -> Transition {
        let now = self.clock.now_millis();
        self.stop_at(now, reason)
    }

    /// Re-enters Tracking for a session recovered from a marker. The marker
    /// already describes this session, so it is not rewritten.
    pub fn resume(&mut self, branch: String, started_at_ms: i64) {
        let now = self.clock.now_millis();
        self.session = Some(Session {
            workspace: self.workspace.to_string(),
            branch,
            started_at_ms,
        });
        self.idle_deadline = Some(now.saturating_add(self.idle_timeout_ms));
        self.last_branch_check_ms = None;
    }

    /// Drops every ledger entry for `workspace`. When that is the workspace
    /// being tracked, the open session restarts now so pre-clear time is
    /// never committed afterwards.
    pub fn clear_workspace(&mut self, workspace: &str) -> Result<bool> {
        let removed = self.ledger.clear(workspace)?;

        if workspace == self.workspace.as_str() {
            let now = self.clock.now_millis();
            if let Some(session) = self.session.as_mut() {
                session.started_at_ms = now;
                let marker = session.to_marker();
                if let Err(err) = self.markers.save(marker) {
                    warn!(error = %err, "Failed to rewrite session marker after clear");
                }
            }
        }

        info!(workspace = %workspace, removed, "Cleared workspace ledger");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────────

    fn handle_signal(&mut self, force_resolve: bool) -> Transition {
        let now = self.clock.now_millis();
        self.expire_if_idle(now);

        if !force_resolve {
            if let (Some(session), Some(last_check)) =
                (self.session.as_ref(), self.last_branch_check_ms)
            {
                if now - last_check < self.branch_check_interval_ms {
                    self.idle_deadline = Some(now.saturating_add(self.idle_timeout_ms));
                    return Transition::Continued {
                        branch: session.branch.clone(),
                    };
                }
            }
        }

        let branch = match self.branches.resolve_branch(&self.project_root) {
            Ok(branch) => branch,
            Err(err) => {
                self.report_resolution_error(&err);
                return Transition::Ignored;
            }
        };
        self.last_branch_check_ms = Some(now);
        self.repo_missing_reported = false;

        match self.session.take() {
            Some(session) if session.branch == branch => {
                self.session = Some(session);
                self.idle_deadline = Some(now.saturating_add(self.idle_timeout_ms));
                Transition::Continued { branch }
            }
            Some(previous) => {
                let committed_secs = self.commit(&previous, now);
                info!(
                    workspace = %self.workspace,
                    from = %previous.branch,
                    to = %branch,
                    committed_secs,
                    "Branch switch"
                );
                self.begin(branch.clone(), now);
                Transition::Switched {
                    from: previous.branch,
                    to: branch,
                    committed_secs,
                }
            }
            None => {
                self.begin(branch.clone(), now);
                Transition::Started { branch }
            }
        }
    }

    /// Closes a session whose deadline passed without a wake being delivered.
    fn expire_if_idle(&mut self, now: i64) {
        if matches!(self.idle_deadline, Some(deadline) if now >= deadline) {
            debug!(workspace = %self.workspace, "Idle deadline passed before signal");
            self.stop_at(now, StopReason::IdleTimeout);
        }
    }

    fn begin(&mut self, branch: String, now: i64) {
        let session = Session {
            workspace: self.workspace.to_string(),
            branch,
            started_at_ms: now,
        };
        if let Err(err) = self.markers.save(session.to_marker()) {
            warn!(error = %err, "Failed to persist session marker");
        }
        info!(workspace = %self.workspace, branch = %session.branch, "Session started");
        self.session = Some(session);
        self.idle_deadline = Some(now.saturating_add(self.idle_timeout_ms));
    }

    fn stop_at(&mut self, now: i64, reason: StopReason) -> Transition {
        let Some(session) = self.session.take() else {
            self.idle_deadline = None;
            return Transition::Ignored;
        };

        // A late wake never bills past the idle deadline.
        let end = match self.idle_deadline {
            Some(deadline) if deadline < now => deadline,
            _ => now,
        };
        self.idle_deadline = None;

        let committed_secs = self.commit(&session, end);
        if let Err(err) = self.markers.clear() {
            warn!(error = %err, "Failed to clear session marker");
        }

        info!(
            workspace = %self.workspace,
            branch = %session.branch,
            committed_secs,
            reason = ?reason,
            "Session stopped"
        );
        Transition::Stopped {
            branch: session.branch,
            committed_secs,
            reason,
        }
    }

    fn commit(&mut self, session: &Session, end_ms: i64) -> u64 {
        let seconds = session.elapsed_secs(end_ms);
        if let Err(err) = self
            .ledger
            .commit(&session.workspace, &session.branch, seconds)
        {
            error!(
                workspace = %session.workspace,
                branch = %session.branch,
                seconds,
                error = %err,
                "Failed to persist ledger; increment kept in memory only"
            );
        }
        seconds
    }

    fn report_resolution_error(&mut self, err: &TrackerError) {
        if err.is_not_a_repository() {
            if self.repo_missing_reported {
                debug!(root = %self.project_root.display(), "Still not a repository");
            } else {
                info!(
                    root = %self.project_root.display(),
                    "Not a repository; tracking paused"
                );
                self.repo_missing_reported = true;
            }
        } else {
            warn!(error = %err, "Branch resolution failed; signal ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::{Cell, RefCell};

    const T0: i64 = 1_767_225_600_000;

    struct FakeBranches {
        branch: RefCell<Option<String>>,
        calls: Cell<usize>,
    }

    impl FakeBranches {
        fn on(branch: &str) -> Self {
            Self {
                branch: RefCell::new(Some(branch.to_string())),
                calls: Cell::new(0),
            }
        }

        fn checkout(&self, branch: &str) {
            *self.branch.borrow_mut() = Some(branch.to_string());
        }
    }

    impl BranchSource for FakeBranches {
        fn resolve_branch(&self, project_root: &Path) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.branch
                .borrow()
                .clone()
                .ok_or_else(|| TrackerError::NotARepository(project_root.to_path_buf()))
        }
    }

    fn config(interval_secs: u64) -> TrackerConfig {
        TrackerConfig {
            idle_timeout_secs: 60,
            branch_check_interval_secs: interval_secs,
            ..TrackerConfig::default()
        }
    }

    fn tracker<'a>(
        branches: &'a FakeBranches,
        clock: &ManualClock,
        interval_secs: u64,
    ) -> SessionTracker<&'a FakeBranches, ManualClock> {
        SessionTracker::new(
            Path::new("/work/app"),
            &config(interval_secs),
            branches,
            clock.clone(),
            Ledger::new_in_memory(),
            MarkerStore::new_in_memory(),
        )
    }

    fn total(t: &SessionTracker<&FakeBranches, ManualClock>, branch: &str) -> u64 {
        t.ledger()
            .get(t.workspace().as_str())
            .get(branch)
            .copied()
            .unwrap_or(0)
    }

    #[test]
    fn test_first_activity_starts_session_and_writes_marker() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        assert_eq!(
            t.on_activity(),
            Transition::Started {
                branch: "main".to_string()
            }
        );
        assert_eq!(t.session().unwrap().started_at_ms, T0);
        assert_eq!(t.idle_deadline(), Some(T0 + 60_000));
        let marker = t.markers().current().expect("marker");
        assert_eq!(marker.branch, "main");
        assert_eq!(marker.started_at_epoch_millis, T0);
    }

    #[test]
    fn test_same_branch_activity_keeps_start_and_commits_nothing() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(30);
        assert!(matches!(t.on_activity(), Transition::Continued { .. }));
        clock.advance_secs(30);
        assert!(matches!(t.on_activity(), Transition::Continued { .. }));

        assert_eq!(t.session().unwrap().started_at_ms, T0);
        assert!(t.ledger().get(t.workspace().as_str()).is_empty());
        assert_eq!(t.idle_deadline(), Some(T0 + 120_000));
    }

    #[test]
    fn test_branch_switch_commits_old_branch_then_starts_new() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(45);
        branches.checkout("feature/x");

        assert_eq!(
            t.on_activity(),
            Transition::Switched {
                from: "main".to_string(),
                to: "feature/x".to_string(),
                committed_secs: 45,
            }
        );
        assert_eq!(total(&t, "main"), 45);
        assert_eq!(t.session().unwrap().started_at_ms, T0 + 45_000);
        assert_eq!(t.markers().current().unwrap().branch, "feature/x");
    }

    #[test]
    fn test_focus_lost_stops_and_clears_marker() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_millis(12_999);
        assert_eq!(
            t.on_focus_lost(),
            Transition::Stopped {
                branch: "main".to_string(),
                committed_secs: 12,
                reason: StopReason::FocusLost,
            }
        );
        assert!(!t.is_tracking());
        assert!(t.markers().current().is_none());
        assert_eq!(t.idle_deadline(), None);
        assert_eq!(t.on_focus_lost(), Transition::Ignored);
    }

    #[test]
    fn test_zero_length_session_still_commits() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        t.on_focus_lost();
        assert_eq!(
            t.ledger().get(t.workspace().as_str()).get("main"),
            Some(&0)
        );
    }

    #[test]
    fn test_idle_timeout_before_deadline_is_ignored() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(50);
        t.on_activity();
        // Wake scheduled for the first deadline arrives after the reschedule.
        clock.advance_secs(10);
        assert_eq!(t.on_idle_timeout(), Transition::Ignored);
        assert!(t.is_tracking());

        clock.advance_secs(50);
        assert_eq!(
            t.on_idle_timeout(),
            Transition::Stopped {
                branch: "main".to_string(),
                committed_secs: 110,
                reason: StopReason::IdleTimeout,
            }
        );
        assert_eq!(t.on_idle_timeout(), Transition::Ignored);
    }

    #[test]
    fn test_late_idle_wake_bills_only_up_to_deadline() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(3600);
        assert!(matches!(
            t.on_idle_timeout(),
            Transition::Stopped {
                committed_secs: 60,
                ..
            }
        ));
    }

    #[test]
    fn test_activity_after_missed_deadline_closes_old_session_first() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(600);
        assert_eq!(
            t.on_activity(),
            Transition::Started {
                branch: "main".to_string()
            }
        );
        assert_eq!(total(&t, "main"), 60);
        assert_eq!(t.session().unwrap().started_at_ms, T0 + 600_000);
    }

    #[test]
    fn test_resolution_failure_leaves_state_untouched() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        *branches.branch.borrow_mut() = None;
        clock.advance_secs(10);
        assert_eq!(t.on_activity(), Transition::Ignored);
        assert_eq!(t.session().unwrap().branch, "main");
        assert_eq!(t.idle_deadline(), Some(T0 + 60_000));
    }

    #[test]
    fn test_not_a_repository_never_starts() {
        let branches = FakeBranches::on("main");
        *branches.branch.borrow_mut() = None;
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        assert_eq!(t.on_activity(), Transition::Ignored);
        assert_eq!(t.on_focus_gained(), Transition::Ignored);
        assert!(!t.is_tracking());
        assert!(t.markers().current().is_none());
    }

    #[test]
    fn test_activity_within_check_interval_skips_resolution() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 5);

        t.on_activity();
        for _ in 0..10 {
            clock.advance_millis(100);
            assert!(matches!(t.on_activity(), Transition::Continued { .. }));
        }
        assert_eq!(branches.calls.get(), 1);

        clock.advance_secs(5);
        t.on_activity();
        assert_eq!(branches.calls.get(), 2);
    }

    #[test]
    fn test_focus_gained_bypasses_check_interval() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 5);

        t.on_activity();
        branches.checkout("hotfix");
        clock.advance_secs(1);
        assert!(matches!(t.on_activity(), Transition::Continued { .. }));
        assert!(matches!(t.on_focus_gained(), Transition::Switched { .. }));
        assert_eq!(total(&t, "main"), 1);
    }

    #[test]
    fn test_resume_keeps_original_start() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 5);

        t.resume("main".to_string(), T0 - 120_000);
        assert_eq!(t.idle_deadline(), Some(T0 + 60_000));
        assert!(matches!(t.on_activity(), Transition::Continued { .. }));
        assert_eq!(branches.calls.get(), 1);

        clock.advance_secs(30);
        t.stop(StopReason::Shutdown);
        assert_eq!(total(&t, "main"), 150);
    }

    #[test]
    fn test_clear_own_workspace_rebases_open_session() {
        let branches = FakeBranches::on("main");
        let clock = ManualClock::new(T0);
        let mut t = tracker(&branches, &clock, 0);

        t.on_activity();
        clock.advance_secs(20);
        t.on_focus_lost();
        t.on_activity();
        clock.advance_secs(40);

        let ws = t.workspace().to_string();
        assert!(t.clear_workspace(&ws).unwrap());
        assert_eq!(t.session().unwrap().started_at_ms, T0 + 60_000);
        assert_eq!(
            t.markers().current().unwrap().started_at_epoch_millis,
            T0 + 60_000
        );

        clock.advance_secs(5);
        t.on_focus_lost();
        assert_eq!(total(&t, "main"), 5);
    }
}
