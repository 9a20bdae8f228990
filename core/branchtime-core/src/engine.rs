//! TrackerEngine - the single entry point a host constructs per project root.
//!
//! The engine owns every piece of mutable tracking state (open session, idle
//! deadline, ledger, marker) as private fields. Hosts drive it with lifecycle
//! hooks and query it for summaries:
//!
//! ```rust,ignore
//! use branchtime_core::TrackerEngine;
//!
//! let mut engine = TrackerEngine::new(Path::new("/work/app"));
//! engine.start();            // resumes a recent crashed session, if any
//! engine.on_focus_gained();
//! engine.on_activity();
//! // ... schedule a wake at engine.idle_deadline() and call on_idle_timeout()
//! engine.on_shutdown();
//! ```
//!
//! - **Synchronous**: No async runtime dependency.
//! - **Not thread-safe**: Every hook takes `&mut self`; hosts serialize signals.
//! - **Graceful degradation**: Branch and storage failures are logged, never raised.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::branch::{BranchSource, GitBranchResolver};
use crate::clock::{Clock, SystemClock};
use crate::config::{load_tracker_config, TrackerConfig};
use crate::error::Result;
use crate::export::{self, ExportSnapshot};
use crate::identity::WorkspaceIdentity;
use crate::ledger::{BranchTotals, Ledger};
use crate::marker::MarkerStore;
use crate::recovery::{RecoveryManager, ResumeDecision};
use crate::session::Session;
use crate::signal::Signal;
use crate::storage::StorageConfig;
use crate::tracker::{SessionTracker, StopReason, Transition};

pub struct TrackerEngine<B = GitBranchResolver, C = SystemClock> {
    storage: StorageConfig,
    config: TrackerConfig,
    tracker: SessionTracker<B, C>,
    recovery: RecoveryManager,
    /// Recovery outcome of the current run; `None` until `start`.
    start_decision: Option<ResumeDecision>,
}

impl TrackerEngine {
    /// Creates an engine with default storage (`~/.branchtime`) and git.
    pub fn new(project_root: &Path) -> Self {
        Self::with_storage(project_root, StorageConfig::default())
    }

    /// Creates an engine with custom storage; tunables come from its `config.toml`.
    pub fn with_storage(project_root: &Path, storage: StorageConfig) -> Self {
        let config = load_tracker_config(&storage.config_file()).unwrap_or_else(|err| {
            warn!(error = %err, "Failed to load tracker config; using defaults");
            TrackerConfig::default()
        });
        let resolver = GitBranchResolver::new(config.git_command.clone());
        Self::with_parts(project_root, storage, config, resolver, SystemClock)
    }
}

impl<B: BranchSource, C: Clock> TrackerEngine<B, C> {
    /// Creates an engine from explicit collaborators. Loads the ledger and
    /// marker from `storage`; nothing is resumed until [`start`](Self::start).
    pub fn with_parts(
        project_root: &Path,
        storage: StorageConfig,
        config: TrackerConfig,
        branches: B,
        clock: C,
    ) -> Self {
        let ledger = Ledger::load(&storage.ledger_file());
        let markers = MarkerStore::load(&storage.marker_file());
        let tracker = SessionTracker::new(project_root, &config, branches, clock, ledger, markers);
        let recovery = RecoveryManager::new(config.recovery_max_age_ms());

        Self {
            storage,
            config,
            tracker,
            recovery,
            start_decision: None,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn workspace(&self) -> &WorkspaceIdentity {
        self.tracker.workspace()
    }

    pub fn project_root(&self) -> &Path {
        self.tracker.project_root()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.tracker.session()
    }

    pub fn idle_deadline(&self) -> Option<i64> {
        self.tracker.idle_deadline()
    }

    pub fn is_started(&self) -> bool {
        self.start_decision.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Runs crash recovery against the stored marker. Later calls before
    /// [`shutdown`](Self::shutdown) return the first decision without
    /// recovering again.
    pub fn start(&mut self) -> ResumeDecision {
        if let Some(decision) = &self.start_decision {
            debug!("Engine already started");
            return decision.clone();
        }

        let now = self.tracker.now_ms();
        let workspace = self.tracker.workspace().to_string();
        let decision = self
            .recovery
            .apply(&workspace, self.tracker.markers_mut(), now);

        if let ResumeDecision::Resume {
            branch,
            started_at_ms,
        } = &decision
        {
            self.tracker.resume(branch.clone(), *started_at_ms);
        }

        self.start_decision = Some(decision.clone());
        decision
    }

    /// Clean stop: commits the open session and removes the marker.
    pub fn shutdown(&mut self) -> Transition {
        self.start_decision = None;
        self.tracker.stop(StopReason::Shutdown)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Host hooks
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn on_activity(&mut self) -> Transition {
        self.tracker.on_activity()
    }

    pub fn on_focus_gained(&mut self) -> Transition {
        self.tracker.on_focus_gained()
    }

    pub fn on_focus_lost(&mut self) -> Transition {
        self.tracker.on_focus_lost()
    }

    pub fn on_idle_timeout(&mut self) -> Transition {
        self.tracker.on_idle_timeout()
    }

    pub fn on_shutdown(&mut self) -> Transition {
        self.shutdown()
    }

    /// Idempotent manual trigger; resolves the branch even inside the throttle window.
    pub fn start_tracking_if_branch_found(&mut self) -> Transition {
        self.tracker.on_focus_gained()
    }

    pub fn stop_tracking(&mut self) -> Transition {
        self.tracker.stop(StopReason::Explicit)
    }

    pub fn dispatch(&mut self, signal: Signal) -> Transition {
        match signal {
            Signal::Activity => self.on_activity(),
            Signal::FocusGained => self.on_focus_gained(),
            Signal::FocusLost => self.on_focus_lost(),
            Signal::Start => self.start_tracking_if_branch_found(),
            Signal::Stop => self.stop_tracking(),
            Signal::Shutdown => self.on_shutdown(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Ledger API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Per-branch seconds for a workspace; empty when nothing was tracked.
    pub fn get_workspace_summary(&self, workspace_id: &str) -> BranchTotals {
        self.tracker.ledger().get(workspace_id)
    }

    pub fn export_snapshot(&self, workspace_id: &str) -> ExportSnapshot {
        let exported_at =
            DateTime::<Utc>::from_timestamp_millis(self.tracker.now_ms()).unwrap_or_else(Utc::now);
        export::export_snapshot(
            workspace_id,
            &self.get_workspace_summary(workspace_id),
            exported_at,
        )
    }

    pub fn clear_workspace(&mut self, workspace_id: &str) -> Result<bool> {
        self.tracker.clear_workspace(workspace_id)
    }

    pub fn known_workspaces(&self) -> Vec<String> {
        self.tracker.ledger().workspaces()
    }
}
