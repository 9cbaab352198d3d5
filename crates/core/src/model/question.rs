use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOptionOutOfRange { index: usize, len: usize },

    #[error("question field `{0}` cannot be empty")]
    BlankField(&'static str),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question shape, as assembled at the repository boundary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: Option<String>,
    pub topic: String,
    pub sub_skill: String,
    pub set_id: String,
    pub test_type: String,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt,
    /// `QuestionError::BlankField` when a grouping key is blank, and
    /// `QuestionError::CorrectOptionOutOfRange` when options exist but the
    /// correct index does not address one of them.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        for (name, value) in [
            ("topic", &self.topic),
            ("sub_skill", &self.sub_skill),
            ("set_id", &self.set_id),
            ("test_type", &self.test_type),
        ] {
            if value.trim().is_empty() {
                return Err(QuestionError::BlankField(name));
            }
        }
        if !self.options.is_empty() && self.correct_option >= self.options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index: self.correct_option,
                len: self.options.len(),
            });
        }

        let explanation = self
            .explanation
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(Question {
            id: self.id,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            explanation,
            topic: self.topic,
            sub_skill: self.sub_skill,
            set_id: self.set_id,
            test_type: self.test_type,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice catalogue question.
///
/// Immutable once validated; `correct_option` always addresses an entry of
/// `options` when `options` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
    explanation: Option<String>,
    topic: String,
    sub_skill: String,
    set_id: String,
    test_type: String,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn sub_skill(&self) -> &str {
        &self.sub_skill
    }

    #[must_use]
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    #[must_use]
    pub fn test_type(&self) -> &str {
        &self.test_type
    }

    /// Returns true when `index` addresses one of the options.
    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    /// Returns true if the given option is the correct one.
    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        self.has_option(index) && index == self.correct_option
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
