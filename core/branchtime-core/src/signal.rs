//! Host signals, as delivered by whatever environment embeds the engine.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Activity,
    FocusGained,
    FocusLost,
    /// Manual "start tracking if a branch is found".
    Start,
    /// Explicit stop request; the engine stays alive.
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" => Ok(Signal::Activity),
            "focus-gained" | "focus_gained" => Ok(Signal::FocusGained),
            "focus-lost" | "focus_lost" => Ok(Signal::FocusLost),
            "start" => Ok(Signal::Start),
            "stop" => Ok(Signal::Stop),
            "shutdown" | "quit" => Ok(Signal::Shutdown),
            other => Err(UnknownSignal(other.to_string())),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Activity => "activity",
            Signal::FocusGained => "focus-gained",
            Signal::FocusLost => "focus-lost",
            Signal::Start => "start",
            Signal::Stop => "stop",
            Signal::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_signals_case_insensitively() {
        assert_eq!("activity".parse::<Signal>(), Ok(Signal::Activity));
        assert_eq!(" Focus-Gained ".parse::<Signal>(), Ok(Signal::FocusGained));
        assert_eq!("focus_lost".parse::<Signal>(), Ok(Signal::FocusLost));
        assert_eq!("quit".parse::<Signal>(), Ok(Signal::Shutdown));
    }

    #[test]
    fn rejects_unknown_signal() {
        assert_eq!(
            "keystroke".parse::<Signal>(),
            Err(UnknownSignal("keystroke".to_string()))
        );
    }

    #[test]
    fn display_matches_parse() {
        for signal in [
            Signal::Activity,
            Signal::FocusGained,
            Signal::FocusLost,
            Signal::Start,
            Signal::Stop,
            Signal::Shutdown,
        ] {
            assert_eq!(signal.to_string().parse::<Signal>(), Ok(signal));
        }
    }
}
