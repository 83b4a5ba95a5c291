mod vote;

pub use vote::{SlotState, SubmitError, SubmitOutcome, VoteSubmitter};

use std::fmt;
use std::str::FromStr;

/// Whether one device gets one vote per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionMode {
    /// One slot per device id; the first vote wins and later ones are refused.
    #[default]
    Normal,
    /// No duplicate check; every submission is stored as a new vote. For
    /// demos and load testing only.
    Unrestricted,
}

impl FromStr for SubmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(SubmissionMode::Normal),
            "unrestricted" | "test" => Ok(SubmissionMode::Unrestricted),
            other => Err(format!(
                "unknown submission mode '{}', expected 'normal' or 'unrestricted'",
                other
            )),
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionMode::Normal => f.write_str("normal"),
            SubmissionMode::Unrestricted => f.write_str("unrestricted"),
        }
    }
}
