use chrono::{DateTime, Utc};
use std::fmt;

use prep_core::model::{Attempt, Question, QuestionId, SessionId, SessionMode};

use super::progress::SessionProgress;
use crate::policy::ModePolicy;

/// Where the learner is within the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestionStage {
    Answering,
    AwaitingReveal,
    Revealed,
}

/// Correctness and explanation shown after answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub question_id: QuestionId,
    pub selected_option: Option<usize>,
    pub correct_option: usize,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// In-memory run through a fixed, ordered question set.
///
/// Owned and mutated only by `SessionController`; everything public here
/// is read-only.
pub struct Session {
    id: SessionId,
    policy: ModePolicy,
    questions: Vec<Question>,
    current: usize,
    selected: Option<usize>,
    stage: QuestionStage,
    attempts: Vec<Option<Attempt>>,
    correct_count: u32,
    started_at: DateTime<Utc>,
    question_started_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `questions` must be non-empty; the controller checks before calling.
    pub(crate) fn new(
        policy: ModePolicy,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let attempts = vec![None; questions.len()];
        Self {
            id: SessionId::new_v4(),
            policy,
            questions,
            current: 0,
            selected: None,
            stage: QuestionStage::Answering,
            attempts,
            correct_count: 0,
            started_at,
            question_started_at: Some(started_at),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.policy.mode
    }

    #[must_use]
    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn feedback_visible(&self) -> bool {
        self.stage == QuestionStage::Revealed
    }

    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.attempts.get(index).is_some_and(Option::is_some)
    }

    /// Per-question answered flags, parallel to `questions()`.
    #[must_use]
    pub fn answered_flags(&self) -> Vec<bool> {
        self.attempts.iter().map(Option::is_some).collect()
    }

    /// Attempts captured so far, indexed like `questions()`.
    #[must_use]
    pub fn attempts(&self) -> &[Option<Attempt>] {
        &self.attempts
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn question_started_at(&self) -> Option<DateTime<Utc>> {
        self.question_started_at
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.attempts.iter().flatten().count();
        SessionProgress {
            total: self.questions.len(),
            current_index: self.current,
            answered,
            remaining: self.questions.len().saturating_sub(answered),
            correct: self.correct_count,
        }
    }

    /// Feedback for the current question, once it has been revealed.
    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        if !self.feedback_visible() {
            return None;
        }
        let attempt = self.attempts[self.current].as_ref()?;
        let question = self.current_question();
        Some(Feedback {
            question_id: question.id(),
            selected_option: attempt.selected_option,
            correct_option: question.correct_option(),
            is_correct: attempt.is_correct,
            explanation: question.explanation().map(str::to_owned),
        })
    }

    /// Outcome per question as captured at answer time; unanswered counts as incorrect.
    #[must_use]
    pub fn outcomes(&self) -> Vec<bool> {
        self.attempts
            .iter()
            .map(|attempt| attempt.as_ref().is_some_and(|a| a.is_correct))
            .collect()
    }

    pub(crate) fn stage(&self) -> QuestionStage {
        self.stage
    }

    pub(crate) fn store_attempt(&mut self, attempt: Attempt, stage: QuestionStage) {
        if attempt.is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
        }
        self.selected = attempt.selected_option;
        self.attempts[self.current] = Some(attempt);
        self.stage = stage;
    }

    pub(crate) fn reveal(&mut self) {
        self.stage = QuestionStage::Revealed;
    }

    /// Move to `index`, clearing selection and feedback state.
    pub(crate) fn move_to(&mut self, index: usize, now: DateTime<Utc>) {
        self.current = index;
        self.selected = None;
        self.stage = QuestionStage::Answering;
        self.question_started_at = Some(now);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.policy.mode)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("stage", &self.stage)
            .field("correct_count", &self.correct_count)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
