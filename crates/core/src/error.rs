use thiserror::Error;

use crate::model::QuestionError;
use crate::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
