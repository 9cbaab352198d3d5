use async_trait::async_trait;
use prep_core::model::{Attempt, DrillResult, Question, TestResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::record::QuestionRecord;
use crate::repository::{
    AttemptRecorder, PerformanceStore, QuestionQuery, QuestionRepository, StorageError,
};

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Serves all three capabilities; clones share the same underlying state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    attempts: Arc<Mutex<Vec<Attempt>>>,
    test_results: Arc<Mutex<Vec<TestResult>>>,
    drill_results: Arc<Mutex<Vec<DrillResult>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from already validated questions.
    #[must_use]
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions: Arc::new(Mutex::new(questions)),
            ..Self::default()
        }
    }

    /// Parse a JSON array of catalogue rows into a repository.
    ///
    /// Malformed rows are skipped and logged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the document is not a JSON array.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let rows: Vec<serde_json::Value> =
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let records: Vec<QuestionRecord> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(row, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(row, error = %err, "skipping unreadable question record");
                    None
                }
            })
            .collect();
        let repo = Self::new();
        repo.load_records(records)?;
        Ok(repo)
    }

    /// Validate and append catalogue rows, returning how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn load_records(
        &self,
        records: impl IntoIterator<Item = QuestionRecord>,
    ) -> Result<usize, StorageError> {
        let mut guard = lock(&self.questions)?;
        let mut accepted = 0;
        for (row, record) in records.into_iter().enumerate() {
            let id = record.id;
            match record.into_question() {
                Ok(question) => {
                    guard.push(question);
                    accepted += 1;
                }
                Err(err) => warn!(row, ?id, error = %err, "skipping malformed question record"),
            }
        }
        debug!(accepted, total = guard.len(), "question records loaded");
        Ok(accepted)
    }

    /// Attempts persisted so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        Ok(lock(&self.attempts)?.clone())
    }

    /// Test results applied so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn test_results(&self) -> Result<Vec<TestResult>, StorageError> {
        Ok(lock(&self.test_results)?.clone())
    }

    /// Drill results applied so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn drill_results(&self) -> Result<Vec<DrillResult>, StorageError> {
        Ok(lock(&self.drill_results)?.clone())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn fetch(&self, query: &QuestionQuery) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(guard
            .iter()
            .filter(|q| query.matches(q))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptRecorder for InMemoryRepository {
    async fn persist(&self, attempt: &Attempt) -> Result<(), StorageError> {
        lock(&self.attempts)?.push(attempt.clone());
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for InMemoryRepository {
    async fn apply_test_result(&self, result: &TestResult) -> Result<(), StorageError> {
        lock(&self.test_results)?.push(result.clone());
        Ok(())
    }

    async fn apply_drill_result(&self, result: &DrillResult) -> Result<(), StorageError> {
        lock(&self.drill_results)?.push(result.clone());
        Ok(())
    }
}
