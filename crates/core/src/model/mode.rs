use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of question session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One fixed diagnostic set, immediate feedback, untimed.
    Diagnostic,
    /// Short sub-skill drill with a per-question countdown.
    Drill,
    /// Full-length practice test under a whole-session countdown.
    Practice,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Diagnostic => "diagnostic",
            SessionMode::Drill => "drill",
            SessionMode::Practice => "practice",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When correctness and explanation are shown to the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackTiming {
    /// Revealed as soon as an option is submitted.
    #[default]
    Immediate,
    /// Submission only stages the answer; a separate reveal shows feedback.
    Deferred,
}
