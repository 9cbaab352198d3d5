use async_trait::async_trait;
use prep_core::model::{Attempt, DrillResult, Question, TestResult};
use std::sync::Arc;
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),
}

//
// ─── QUERY ─────────────────────────────────────────────────────────────────────
//

/// Constraint on the catalogue `set_id` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetFilter {
    Any,
    Exact(String),
    Prefix(String),
}

impl SetFilter {
    #[must_use]
    pub fn matches(&self, set_id: &str) -> bool {
        match self {
            SetFilter::Any => true,
            SetFilter::Exact(wanted) => set_id == wanted,
            SetFilter::Prefix(prefix) => set_id
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
        }
    }
}

/// Request shape for a question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    pub test_type: String,
    pub set: SetFilter,
    pub sub_skill: Option<String>,
    pub limit: Option<usize>,
}

impl QuestionQuery {
    #[must_use]
    pub fn new(test_type: impl Into<String>) -> Self {
        Self {
            test_type: test_type.into(),
            set: SetFilter::Any,
            sub_skill: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_set(mut self, set: SetFilter) -> Self {
        self.set = set;
        self
    }

    #[must_use]
    pub fn with_sub_skill(mut self, sub_skill: impl Into<String>) -> Self {
        self.sub_skill = Some(sub_skill.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the question satisfies every filter of this query.
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        question.test_type() == self.test_type
            && self.set.matches(question.set_id())
            && self
                .sub_skill
                .as_deref()
                .is_none_or(|wanted| question.sub_skill() == wanted)
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to the question catalogue.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Fetch the questions matching `query`, in catalogue order.
    ///
    /// An empty vector is a valid answer, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or query failures.
    async fn fetch(&self, query: &QuestionQuery) -> Result<Vec<Question>, StorageError>;
}

/// Sink for individual answer attempts.
#[async_trait]
pub trait AttemptRecorder: Send + Sync {
    /// Persist one attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn persist(&self, attempt: &Attempt) -> Result<(), StorageError>;
}

/// Sink for aggregate learner performance.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Fold a completed diagnostic or practice result into the learner's history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn apply_test_result(&self, result: &TestResult) -> Result<(), StorageError>;

    /// Fold a completed drill into the learner's per-sub-skill history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn apply_drill_result(&self, result: &DrillResult) -> Result<(), StorageError>;
}

/// Aggregates the three capabilities behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRecorder>,
    pub performance: Arc<dyn PerformanceStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository (e.g. one loaded from a question bank).
    #[must_use]
    pub fn from_memory(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRecorder> = Arc::new(repo.clone());
        let performance: Arc<dyn PerformanceStore> = Arc::new(repo);
        Self {
            questions,
            attempts,
            performance,
        }
    }
}
