use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("cannot score a session without questions")]
    Empty,

    #[error("{outcomes} outcomes supplied for {questions} questions")]
    LengthMismatch { questions: usize, outcomes: usize },

    #[error("too many questions to score: {0}")]
    TooManyQuestions(usize),
}

//
// ─── SCORECARD ─────────────────────────────────────────────────────────────────
//

/// Numeric reduction of a session's per-question outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub time_spent_minutes: u32,
    pub topic_results: BTreeMap<String, u32>,
    pub sub_skill_results: BTreeMap<String, u32>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    correct: u32,
    total: u32,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }
}

/// Whole percentage of `correct` over `total`, rounded half-up.
///
/// Returns 0 when `total` is 0.
///
/// ```
/// # use prep_core::scoring::percent;
/// assert_eq!(percent(5, 8), 63);
/// assert_eq!(percent(2, 3), 67);
/// assert_eq!(percent(1, 8), 13);
/// ```
#[must_use]
pub fn percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    // floor((100c + t/2) / t) done in integers: (200c + t) / 2t
    let value = (200 * correct + total) / (2 * total);
    u32::try_from(value).unwrap_or(100)
}

/// Reduce per-question outcomes into an overall score and per-topic and
/// per-sub-skill percentages.
///
/// `outcomes[i]` is the correctness captured when `questions[i]` was
/// answered; unanswered questions must be passed as `false`.
///
/// # Errors
///
/// Returns `ScoringError::Empty` for an empty session and
/// `ScoringError::LengthMismatch` when the slices are not parallel.
pub fn aggregate(
    questions: &[Question],
    outcomes: &[bool],
    time_spent_minutes: u32,
) -> Result<Scorecard, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::Empty);
    }
    if questions.len() != outcomes.len() {
        return Err(ScoringError::LengthMismatch {
            questions: questions.len(),
            outcomes: outcomes.len(),
        });
    }
    let total_questions = u32::try_from(questions.len())
        .map_err(|_| ScoringError::TooManyQuestions(questions.len()))?;

    let mut overall = Tally::default();
    let mut topics: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut sub_skills: BTreeMap<&str, Tally> = BTreeMap::new();

    for (question, &correct) in questions.iter().zip(outcomes) {
        overall.record(correct);
        topics.entry(question.topic()).or_default().record(correct);
        sub_skills
            .entry(question.sub_skill())
            .or_default()
            .record(correct);
    }

    Ok(Scorecard {
        score: percent(overall.correct, total_questions),
        correct_count: overall.correct,
        total_questions,
        time_spent_minutes,
        topic_results: into_percentages(topics),
        sub_skill_results: into_percentages(sub_skills),
    })
}

fn into_percentages(groups: BTreeMap<&str, Tally>) -> BTreeMap<String, u32> {
    groups
        .into_iter()
        .map(|(key, tally)| (key.to_owned(), percent(tally.correct, tally.total)))
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
