//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::scoring::ScoringError;
use storage::StorageError;

/// Why a question set could not be used to start a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no questions available")]
    NoQuestions,
    #[error("question set could not be loaded: {0}")]
    Repository(#[from] StorageError),
}

/// A transition that is not valid in the controller's current state.
///
/// Rejections never change state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("no mode has been selected")]
    NoSession,
    #[error("session has not been started")]
    NotStarted,
    #[error("session is already running")]
    AlreadyStarted,
    #[error("option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("question has already been answered")]
    AlreadyAnswered,
    #[error("answer is staged and awaiting reveal")]
    AwaitingReveal,
    #[error("there is no staged answer to reveal")]
    NothingToReveal,
    #[error("session already completed")]
    Completed,
}

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Invalid engine configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question time limit must be > 0")]
    InvalidQuestionTimeLimit,
    #[error("session time limit must be > 0")]
    InvalidSessionTimeLimit,
    #[error("drill question cap must be > 0")]
    InvalidDrillCap,
    #[error("{0} cannot be blank")]
    BlankSetId(&'static str),
    #[error("invalid value for {var}: {raw}")]
    InvalidEnv { var: &'static str, raw: String },
}
