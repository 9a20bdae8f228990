//! Log setup for the CLI host.
//!
//! Logs go to a daily rolling file under `<data-dir>/logs/` so `watch` can keep
//! stdout for transitions. Falls back to stderr when the directory is unusable.
//!
//! Filter: `BRANCHTIME_DEBUG_LOG=1` forces debug; otherwise `BRANCHTIME_LOG`,
//! then `RUST_LOG`, then `info`.

use std::env;

use branchtime_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "branchtime";
const LOG_FILE_SUFFIX: &str = "log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// whole process or buffered lines are lost on exit.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let logs_dir = storage.logs_dir();
    let appender = fs_err::create_dir_all(&logs_dir)
        .map_err(|err| err.to_string())
        .and_then(|()| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .build(&logs_dir)
                .map_err(|err| err.to_string())
        });

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        Err(err) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init();
            tracing::warn!(error = %err, "Log directory unavailable; logging to stderr");
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    let debug_enabled = env::var("BRANCHTIME_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_env("BRANCHTIME_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
