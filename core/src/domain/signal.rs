//! Termination signals accepted by the kill orchestrator.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Signals the orchestrator may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TerminationSignal {
    Hup,
    Int,
    #[default]
    Term,
    Kill,
}

impl TerminationSignal {
    /// Name without the `SIG` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            TerminationSignal::Hup => "HUP",
            TerminationSignal::Int => "INT",
            TerminationSignal::Term => "TERM",
            TerminationSignal::Kill => "KILL",
        }
    }

    /// POSIX signal number.
    pub fn number(&self) -> i32 {
        match self {
            TerminationSignal::Hup => 1,
            TerminationSignal::Int => 2,
            TerminationSignal::Term => 15,
            TerminationSignal::Kill => 9,
        }
    }
}

/// Accepts `TERM`, `term`, `SIGTERM`, `SigTerm` and so on.
impl FromStr for TerminationSignal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "HUP" => Ok(TerminationSignal::Hup),
            "INT" => Ok(TerminationSignal::Int),
            "TERM" => Ok(TerminationSignal::Term),
            "KILL" => Ok(TerminationSignal::Kill),
            _ => Err(Error::Parse(format!("unknown signal: {}", s))),
        }
    }
}

impl std::fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SIG{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_names() {
        for input in ["TERM", "term", "SIGTERM", "sigterm", " SigTerm "] {
            assert_eq!(input.parse::<TerminationSignal>().unwrap(), TerminationSignal::Term);
        }
        assert_eq!("hup".parse::<TerminationSignal>().unwrap(), TerminationSignal::Hup);
        assert_eq!("SIGINT".parse::<TerminationSignal>().unwrap(), TerminationSignal::Int);
        assert_eq!("Kill".parse::<TerminationSignal>().unwrap(), TerminationSignal::Kill);
    }

    #[test]
    fn test_reject_unknown_signal() {
        assert!("USR1".parse::<TerminationSignal>().is_err());
        assert!("SIG".parse::<TerminationSignal>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TerminationSignal::Kill.to_string(), "SIGKILL");
        assert_eq!(TerminationSignal::default(), TerminationSignal::Term);
    }
}
