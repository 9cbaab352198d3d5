use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{SessionId, SessionMode};
use crate::scoring::Scorecard;

/// Identifying header attached to an aggregated scorecard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultHeader {
    pub session_id: SessionId,
    pub product: String,
    pub mode: SessionMode,
    pub test_name: String,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate outcome of a completed session.
///
/// Percentages are whole numbers in `0..=100`. Topics and sub-skills that did
/// not occur in the session are absent from the maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub session_id: SessionId,
    pub product: String,
    pub mode: SessionMode,
    pub test_name: String,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub time_spent_minutes: u32,
    pub topic_results: BTreeMap<String, u32>,
    pub sub_skill_results: BTreeMap<String, u32>,
}

impl TestResult {
    #[must_use]
    pub fn new(header: ResultHeader, card: Scorecard) -> Self {
        Self {
            session_id: header.session_id,
            product: header.product,
            mode: header.mode,
            test_name: header.test_name,
            completed_at: header.completed_at,
            score: card.score,
            correct_count: card.correct_count,
            total_questions: card.total_questions,
            time_spent_minutes: card.time_spent_minutes,
            topic_results: card.topic_results,
            sub_skill_results: card.sub_skill_results,
        }
    }
}

/// Drill outcome handed to the performance store for one sub-skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillResult {
    pub topic: String,
    pub sub_skill: String,
    pub correct_count: u32,
    pub total_count: u32,
    pub time_spent_minutes: u32,
}
