use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use prep_core::model::{Attempt, Question};
use prep_core::time::whole_seconds_between;
use storage::AttemptRecorder;

use crate::dispatch::Dispatcher;

/// Build the attempt for answering `question` with `selected`.
///
/// `selected == None` means the question timed out and is counted incorrect.
/// Time spent is measured from `question_started_at` to `submitted_at`,
/// rounded to whole seconds, and is 0 when the start is unknown.
#[must_use]
pub fn capture_attempt(
    question: &Question,
    test_type: &str,
    selected: Option<usize>,
    question_started_at: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
) -> Attempt {
    let is_correct = selected.is_some_and(|index| question.is_correct(index));
    let time_spent_seconds =
        question_started_at.map_or(0, |start| whole_seconds_between(start, submitted_at));

    Attempt {
        question_id: question.id(),
        test_type: test_type.to_owned(),
        set_id: question.set_id().to_owned(),
        selected_option: selected,
        is_correct,
        time_spent_seconds,
        attempted_at: submitted_at,
    }
}

/// Classifies answers and forwards each attempt to the external recorder.
#[derive(Clone)]
pub struct AnswerRecorder {
    sink: Arc<dyn AttemptRecorder>,
}

impl AnswerRecorder {
    #[must_use]
    pub fn new(sink: Arc<dyn AttemptRecorder>) -> Self {
        Self { sink }
    }

    /// Capture the attempt and hand it to the recorder without waiting.
    pub fn record(
        &self,
        dispatcher: &mut Dispatcher,
        question: &Question,
        test_type: &str,
        selected: Option<usize>,
        question_started_at: Option<DateTime<Utc>>,
        submitted_at: DateTime<Utc>,
    ) -> Attempt {
        let attempt = capture_attempt(
            question,
            test_type,
            selected,
            question_started_at,
            submitted_at,
        );
        debug!(
            question_id = %attempt.question_id,
            is_correct = attempt.is_correct,
            time_spent_seconds = attempt.time_spent_seconds,
            "answer recorded"
        );

        let sink = Arc::clone(&self.sink);
        let outgoing = attempt.clone();
        dispatcher.dispatch("attempt", async move { sink.persist(&outgoing).await });
        attempt
    }
}
