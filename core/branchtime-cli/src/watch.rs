//! Long-running signal router.
//!
//! A reader thread turns stdin lines into [`Signal`]s and sends them over a
//! channel; the main thread owns the engine and is the only place state
//! changes. Waiting on the channel with a timeout equal to the idle deadline
//! doubles as the idle timer, so there is never a second timer to cancel.
//!
//! ```bash
//! editor-events | branchtime watch --root ~/Code/app
//! ```

use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use branchtime_core::{
    format_duration, ResumeDecision, Signal, StorageConfig, TrackerEngine, Transition,
    UnknownSignal,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::CliError;

pub fn run(root: &Path, storage: StorageConfig) -> Result<(), CliError> {
    let mut engine = TrackerEngine::with_storage(root, storage);
    info!(
        root = %root.display(),
        workspace = %engine.workspace(),
        "Watching project"
    );

    if let ResumeDecision::Resume { branch, .. } = engine.start() {
        println!("resumed {}", branch);
    }

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || read_signals(io::stdin().lock(), tx));

    route_signals(&mut engine, &rx);

    print_transition(&engine.shutdown());
    info!(workspace = %engine.workspace(), "Watch finished");
    Ok(())
}

fn route_signals(engine: &mut TrackerEngine, rx: &Receiver<Signal>) {
    loop {
        let received = match engine.idle_deadline() {
            Some(deadline) => {
                let wait_ms = deadline.saturating_sub(Utc::now().timestamp_millis()).max(0);
                rx.recv_timeout(Duration::from_millis(wait_ms as u64))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let transition = match received {
            Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Ok(signal) => {
                debug!(signal = %signal, "Signal received");
                engine.dispatch(signal)
            }
            Err(RecvTimeoutError::Timeout) => engine.on_idle_timeout(),
        };
        print_transition(&transition);
    }
}

fn read_signals<R: BufRead>(reader: R, tx: Sender<Signal>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "Failed to read signal line");
                break;
            }
        };
        match parse_line(&line) {
            Some(Ok(signal)) => {
                if tx.send(signal).is_err() {
                    break;
                }
            }
            Some(Err(err)) => warn!(error = %err, "Skipping unknown signal"),
            None => {}
        }
    }
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<Result<Signal, UnknownSignal>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(trimmed.parse())
}

fn print_transition(transition: &Transition) {
    match transition {
        Transition::Started { branch } => println!("started {}", branch),
        Transition::Switched {
            from,
            to,
            committed_secs,
        } => println!(
            "switched {} -> {} (+{} on {})",
            from,
            to,
            format_duration(*committed_secs),
            from
        ),
        Transition::Stopped {
            branch,
            committed_secs,
            reason,
        } => println!(
            "stopped {} (+{}, {:?})",
            branch,
            format_duration(*committed_secs),
            reason
        ),
        Transition::Continued { .. } | Transition::Ignored => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_skips_blanks_and_comments() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# editor focus events"), None);
        assert_eq!(parse_line(" activity "), Some(Ok(Signal::Activity)));
        assert!(matches!(parse_line("keypress"), Some(Err(_))));
    }

    #[test]
    fn read_signals_forwards_known_lines_in_order() {
        let input = "activity\n\nbogus\nfocus-lost\nquit\n";
        let (tx, rx) = mpsc::channel();
        read_signals(input.as_bytes(), tx);

        let received: Vec<Signal> = rx.iter().collect();
        assert_eq!(
            received,
            vec![Signal::Activity, Signal::FocusLost, Signal::Shutdown]
        );
    }
}
