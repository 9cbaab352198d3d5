use prep_core::model::{Question, QuestionDraft, QuestionError, QuestionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a raw catalogue row cannot become a `Question`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("record is missing `{0}`")]
    MissingField(&'static str),

    #[error("record has a negative correct answer index: {0}")]
    NegativeAnswer(i64),

    #[error(transparent)]
    Invalid(#[from] QuestionError),
}

/// Persisted shape of a catalogue question.
///
/// Every column is optional here so that malformed rows are rejected with a
/// precise reason at this boundary instead of failing deserialization
/// wholesale. Columns the engine does not use (difficulty, timestamps, …)
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: Option<u64>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<i64>,
    pub explanation: Option<String>,
    pub test_type: Option<String>,
    pub set_id: Option<String>,
    pub topic: Option<String>,
    pub sub_skill: Option<String>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: Some(question.id().value()),
            question: Some(question.prompt().to_owned()),
            options: Some(question.options().to_vec()),
            correct_answer: i64::try_from(question.correct_option()).ok(),
            explanation: question.explanation().map(str::to_owned),
            test_type: Some(question.test_type().to_owned()),
            set_id: Some(question.set_id().to_owned()),
            topic: Some(question.topic().to_owned()),
            sub_skill: Some(question.sub_skill().to_owned()),
        }
    }

    /// Convert the record into a validated domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::MissingField` for absent required columns,
    /// `RecordError::NegativeAnswer` for a negative answer index, and
    /// `RecordError::Invalid` when domain validation fails.
    pub fn into_question(self) -> Result<Question, RecordError> {
        let id = self.id.ok_or(RecordError::MissingField("id"))?;
        let prompt = self.question.ok_or(RecordError::MissingField("question"))?;
        let raw_answer = self
            .correct_answer
            .ok_or(RecordError::MissingField("correct_answer"))?;
        let correct_option =
            usize::try_from(raw_answer).map_err(|_| RecordError::NegativeAnswer(raw_answer))?;

        let draft = QuestionDraft {
            id: QuestionId::new(id),
            prompt,
            options: self.options.unwrap_or_default(),
            correct_option,
            explanation: self.explanation,
            topic: self.topic.ok_or(RecordError::MissingField("topic"))?,
            sub_skill: self.sub_skill.ok_or(RecordError::MissingField("sub_skill"))?,
            set_id: self.set_id.ok_or(RecordError::MissingField("set_id"))?,
            test_type: self.test_type.ok_or(RecordError::MissingField("test_type"))?,
        };

        Ok(draft.validate()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> QuestionRecord {
        QuestionRecord {
            id: Some(7),
            question: Some("Which is a prime?".into()),
            options: Some(vec!["4".into(), "6".into(), "7".into()]),
            correct_answer: Some(2),
            explanation: None,
            test_type: Some("EduTest".into()),
            set_id: Some("diagnostic".into()),
            topic: Some("Mathematics".into()),
            sub_skill: Some("Number".into()),
        }
    }

    #[test]
    fn well_formed_record_converts() {
        let question = record().into_question().unwrap();
        assert_eq!(question.id().value(), 7);
        assert!(question.is_correct(2));
        assert_eq!(QuestionRecord::from_question(&question), record());
    }

    #[test]
    fn reports_missing_and_invalid_columns() {
        let mut r = record();
        r.topic = None;
        assert_eq!(r.into_question().unwrap_err(), RecordError::MissingField("topic"));

        let mut r = record();
        r.correct_answer = Some(-1);
        assert_eq!(r.into_question().unwrap_err(), RecordError::NegativeAnswer(-1));

        let mut r = record();
        r.correct_answer = Some(3);
        assert!(matches!(
            r.into_question().unwrap_err(),
            RecordError::Invalid(QuestionError::CorrectOptionOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn deserializes_catalogue_row_ignoring_extra_columns() {
        let json = r#"{
            "id": 3, "question": "Q", "options": ["a", "b"], "correct_answer": 1,
            "explanation": null, "test_type": "EduTest", "set_id": "practice_1",
            "topic": "Verbal", "sub_skill": "Analogies", "difficulty": "hard",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let r: QuestionRecord = serde_json::from_str(json).unwrap();
        let question = r.into_question().unwrap();
        assert_eq!(question.set_id(), "practice_1");
    }
}
