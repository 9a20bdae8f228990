//! # branchtime-core
//!
//! Attributes developer activity time to the checked-out branch of a project
//! and keeps a durable per-workspace ledger of it.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Hosts schedule the idle wake.
//! - **Not thread-safe**: Hosts provide their own serialization of signals.
//! - **Graceful degradation**: Missing repositories and unreadable files yield
//!   empty state, never errors that stop the host.
//! - **Injectable edges**: Branch lookup ([`BranchSource`]) and time ([`Clock`])
//!   are traits, so the state machine runs deterministically under test.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use branchtime_core::TrackerEngine;
//!
//! let mut engine = TrackerEngine::new(Path::new("."));
//! engine.start();
//! engine.on_activity();
//! let totals = engine.get_workspace_summary(engine.workspace().as_str());
//! ```

pub mod branch;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod identity;
pub mod ledger;
pub mod marker;
pub mod recovery;
pub mod session;
pub mod signal;
pub mod storage;
pub mod tracker;

// Re-export commonly used items at crate root
pub use branch::{BranchSource, GitBranchResolver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_tracker_config, TrackerConfig};
pub use engine::TrackerEngine;
pub use error::{Result, TrackerError};
pub use export::{export_snapshot, format_duration, BranchTime, ExportSnapshot};
pub use identity::WorkspaceIdentity;
pub use ledger::{BranchTotals, Ledger};
pub use marker::{MarkerStore, SessionMarker};
pub use recovery::{recover, NoResumeReason, RecoveryManager, ResumeDecision};
pub use session::Session;
pub use signal::{Signal, UnknownSignal};
pub use storage::StorageConfig;
pub use tracker::{SessionTracker, StopReason, Transition};
