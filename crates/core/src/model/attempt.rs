use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Record of one answered question.
///
/// Captured at the moment of submission and never recomputed afterwards.
/// `selected_option` is `None` when the question timed out unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub question_id: QuestionId,
    pub test_type: String,
    pub set_id: String,
    pub selected_option: Option<usize>,
    pub is_correct: bool,
    pub time_spent_seconds: u32,
    pub attempted_at: DateTime<Utc>,
}

impl Attempt {
    /// Returns true if the attempt was produced by a timeout rather than a choice.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected_option.is_none()
    }
}
