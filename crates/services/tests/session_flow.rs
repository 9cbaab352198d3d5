use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use prep_core::model::{
    Attempt, DrillResult, FeedbackTiming, Product, Question, QuestionDraft, QuestionId,
    SessionMode, TestResult,
};
use prep_core::time::fixed_now;
use prep_core::timer::TimerKind;
use services::{
    Advance, Clock, EventOutcome, LoadError, ModeSelection, Rejection, SessionController,
    SessionError, SessionEvent, SessionState, Submission,
};
use storage::{
    AttemptRecorder, InMemoryRepository, PerformanceStore, QuestionQuery, QuestionRepository,
    Storage, StorageError,
};

fn question(id: u64, set_id: &str, topic: &str, sub_skill: &str, correct: usize) -> Question {
    QuestionDraft {
        id: QuestionId::new(id),
        prompt: format!("Question {id}"),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_option: correct,
        explanation: Some(format!("Because {correct}")),
        topic: topic.into(),
        sub_skill: sub_skill.into(),
        set_id: set_id.into(),
        test_type: "EduTest".into(),
    }
    .validate()
    .expect("valid question")
}

fn diagnostic_bank() -> Vec<Question> {
    vec![
        question(1, "diagnostic", "Verbal", "Analogies", 0),
        question(2, "diagnostic", "Verbal", "Synonyms", 1),
        question(3, "diagnostic", "Verbal", "Analogies", 2),
        question(4, "diagnostic", "Numerical", "Fractions", 3),
    ]
}

fn controller(repo: &InMemoryRepository) -> SessionController {
    SessionController::new(Product::EduTest, &Storage::from_memory(repo.clone()))
        .with_clock(Clock::fixed(fixed_now()))
}

fn wrong(question: &Question) -> usize {
    (question.correct_option() + 1) % question.options().len()
}

#[tokio::test]
async fn diagnostic_run_scores_and_hands_off_result() {
    let repo = InMemoryRepository::with_questions(diagnostic_bank());
    let mut ctl = controller(&repo);

    assert_eq!(ctl.state(), SessionState::Idle);
    ctl.begin(ModeSelection::Diagnostic).await.unwrap();
    assert_eq!(ctl.state(), SessionState::InProgress);
    assert_eq!(ctl.time_left(TimerKind::Session), None);

    let plan = [true, false, true, true];
    let mut completed = None;
    for correct in plan {
        ctl.clock_mut().advance(Duration::seconds(30));
        let q = ctl.current_question().unwrap().clone();
        let choice = if correct { q.correct_option() } else { wrong(&q) };

        let Submission::Revealed(feedback) = ctl.submit(choice).unwrap() else {
            panic!("immediate feedback expected");
        };
        assert_eq!(feedback.is_correct, correct);
        assert_eq!(feedback.correct_option, q.correct_option());
        assert_eq!(ctl.state(), SessionState::Feedback);

        if let Advance::Completed(result) = ctl.next().unwrap() {
            completed = Some(result);
        }
    }

    let result = completed.expect("session completes on last next");
    assert_eq!(ctl.state(), SessionState::Completed);
    assert_eq!(ctl.result(), Some(&result));
    assert_eq!(result.mode, SessionMode::Diagnostic);
    assert_eq!(result.product, "edutest");
    assert_eq!(result.test_name, "EduTest Diagnostic Assessment");
    assert_eq!(result.score, 75);
    assert_eq!(result.correct_count, 3);
    assert_eq!(result.total_questions, 4);
    assert_eq!(result.time_spent_minutes, 2);
    assert_eq!(result.topic_results["Verbal"], 67);
    assert_eq!(result.topic_results["Numerical"], 100);
    assert_eq!(result.sub_skill_results["Synonyms"], 0);
    assert_eq!(result.sub_skill_results["Analogies"], 100);

    ctl.settle().await;
    assert_eq!(repo.test_results().unwrap(), vec![result]);
    let attempts = repo.attempts().unwrap();
    assert_eq!(attempts.len(), 4);
    assert!(attempts.iter().all(|a| a.time_spent_seconds == 30));
    assert!(attempts.iter().all(|a| a.test_type == "EduTest"));
    assert!(repo.drill_results().unwrap().is_empty());
}

#[tokio::test]
async fn five_of_eight_rounds_half_up() {
    let bank: Vec<Question> = (1..=8)
        .map(|id| question(id, "practice_2", "Reading", "Inference", 1))
        .collect();
    let repo = InMemoryRepository::with_questions(bank);
    let mut ctl = controller(&repo);

    ctl.begin(ModeSelection::practice("practice_2")).await.unwrap();
    assert_eq!(ctl.time_left(TimerKind::Session), Some(3_600));

    let mut result = None;
    for n in 0..8 {
        let q = ctl.current_question().unwrap().clone();
        let choice = if n < 5 { q.correct_option() } else { wrong(&q) };
        ctl.submit(choice).unwrap();
        if let Advance::Completed(done) = ctl.next().unwrap() {
            result = Some(done);
        }
    }

    let result = result.unwrap();
    assert_eq!(result.score, 63);
    assert_eq!(result.test_name, "EduTest PRACTICE 2");
    assert_eq!(ctl.time_left(TimerKind::Session), None);
}

#[tokio::test]
async fn drill_with_deferred_feedback_hands_off_drill_result() {
    let mut bank: Vec<Question> = (1..=12)
        .map(|id| question(id, &format!("drill-fractions-{id}"), "Mathematics", "Fractions", 0))
        .collect();
    bank.push(question(50, "drill-ratios-1", "Mathematics", "Ratios", 0));
    bank.push(question(51, "practice_1", "Mathematics", "Fractions", 0));
    let repo = InMemoryRepository::with_questions(bank);
    let mut ctl = controller(&repo);

    let loaded = ctl
        .configure(ModeSelection::Drill {
            topic: "Mathematics".into(),
            sub_skill: "Fractions".into(),
            feedback: FeedbackTiming::Deferred,
        })
        .await
        .unwrap();
    assert_eq!(loaded, 10);
    assert_eq!(ctl.state(), SessionState::Configuring);

    ctl.start().unwrap();
    assert_eq!(ctl.time_left(TimerKind::Question), Some(60));

    assert_eq!(ctl.submit(0).unwrap(), Submission::Staged);
    assert_eq!(ctl.state(), SessionState::Feedback);
    assert_eq!(ctl.feedback(), None);
    assert_eq!(ctl.time_left(TimerKind::Question), None);
    assert!(matches!(
        ctl.submit(1),
        Err(SessionError::Rejected(Rejection::AwaitingReveal))
    ));

    let feedback = ctl.reveal().unwrap();
    assert!(feedback.is_correct);
    assert_eq!(feedback.explanation.as_deref(), Some("Because 0"));
    assert!(matches!(
        ctl.reveal(),
        Err(SessionError::Rejected(Rejection::NothingToReveal))
    ));

    assert_eq!(ctl.next().unwrap(), Advance::Moved { index: 1 });
    assert_eq!(ctl.time_left(TimerKind::Question), Some(60));

    // Skip the rest: unanswered questions count as incorrect.
    let mut result = None;
    while result.is_none() {
        if let Advance::Completed(done) = ctl.next().unwrap() {
            result = Some(done);
        }
    }
    let result = result.unwrap();
    assert_eq!(result.test_name, "Fractions Drill");
    assert_eq!(result.total_questions, 10);
    assert_eq!(result.correct_count, 1);
    assert_eq!(result.score, 10);

    ctl.settle().await;
    assert_eq!(
        repo.drill_results().unwrap(),
        vec![DrillResult {
            topic: "Mathematics".into(),
            sub_skill: "Fractions".into(),
            correct_count: 1,
            total_count: 10,
            time_spent_minutes: 0,
        }]
    );
    assert!(repo.test_results().unwrap().is_empty());
    assert_eq!(repo.attempts().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_set_cannot_start() {
    let repo = InMemoryRepository::with_questions(diagnostic_bank());
    let mut ctl = controller(&repo);

    let loaded = ctl
        .configure(ModeSelection::practice("practice_5"))
        .await
        .unwrap();
    assert_eq!(loaded, 0);

    let err = ctl.start().unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::NoQuestions)));
    assert_eq!(ctl.state(), SessionState::Configuring);
}

#[tokio::test]
async fn navigation_edges_and_rejections() {
    let repo = InMemoryRepository::with_questions(diagnostic_bank());
    let mut ctl = controller(&repo);

    assert!(!ctl.abandon());
    assert!(!ctl.previous());
    assert!(matches!(
        ctl.submit(0),
        Err(SessionError::Rejected(Rejection::NoSession))
    ));
    assert!(matches!(
        ctl.next(),
        Err(SessionError::Rejected(Rejection::NoSession))
    ));

    ctl.configure(ModeSelection::Diagnostic).await.unwrap();
    assert!(matches!(
        ctl.submit(0),
        Err(SessionError::Rejected(Rejection::NotStarted))
    ));
    ctl.start().unwrap();
    assert!(matches!(
        ctl.start(),
        Err(SessionError::Rejected(Rejection::AlreadyStarted))
    ));

    assert!(!ctl.previous());
    assert_eq!(ctl.progress().unwrap().current_index, 0);

    assert!(matches!(
        ctl.submit(4),
        Err(SessionError::Rejected(Rejection::OptionOutOfRange { index: 4, len: 4 }))
    ));
    assert_eq!(ctl.state(), SessionState::InProgress);

    ctl.submit(0).unwrap();
    assert!(matches!(
        ctl.submit(0),
        Err(SessionError::Rejected(Rejection::AlreadyAnswered))
    ));

    ctl.next().unwrap();
    assert!(ctl.previous());
    let progress = ctl.progress().unwrap();
    assert_eq!(progress.current_index, 0);
    assert_eq!(progress.answered, 1);
    assert_eq!(progress.correct, 1);
    assert!(matches!(
        ctl.submit(1),
        Err(SessionError::Rejected(Rejection::AlreadyAnswered))
    ));

    for _ in 0..3 {
        ctl.next().unwrap();
    }
    assert!(ctl.session().unwrap().is_last());
    assert!(matches!(ctl.next().unwrap(), Advance::Completed(_)));
    assert!(matches!(
        ctl.next(),
        Err(SessionError::Rejected(Rejection::Completed))
    ));
    assert!(!ctl.previous());

    ctl.settle().await;
    assert_eq!(repo.test_results().unwrap().len(), 1);

    assert!(ctl.abandon());
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[tokio::test]
async fn abandon_and_product_switch_emit_nothing() {
    let repo = InMemoryRepository::with_questions(diagnostic_bank());
    let mut ctl = controller(&repo);

    ctl.begin(ModeSelection::Diagnostic).await.unwrap();
    ctl.set_product(Product::Acer);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.product(), Product::Acer);

    let loaded = ctl.configure(ModeSelection::Diagnostic).await.unwrap();
    assert_eq!(loaded, 0, "acer has no questions in this bank");

    ctl.set_product(Product::EduTest);
    ctl.begin(ModeSelection::Diagnostic).await.unwrap();
    assert!(ctl.abandon());

    ctl.settle().await;
    assert!(repo.attempts().unwrap().is_empty());
    assert!(repo.test_results().unwrap().is_empty());
}

#[tokio::test]
async fn events_drive_the_same_transitions() {
    let repo = InMemoryRepository::with_questions(diagnostic_bank());
    let mut ctl = controller(&repo);
    ctl.begin(ModeSelection::Diagnostic).await.unwrap();

    let outcome = ctl.handle(SessionEvent::Submit(0)).unwrap();
    assert!(matches!(
        outcome,
        EventOutcome::Submitted(Submission::Revealed(ref f)) if f.is_correct
    ));
    assert_eq!(
        ctl.handle(SessionEvent::Next).unwrap(),
        EventOutcome::Advanced(Advance::Moved { index: 1 })
    );
    assert_eq!(
        ctl.handle(SessionEvent::Previous).unwrap(),
        EventOutcome::Navigated(true)
    );
    assert!(ctl.handle(SessionEvent::Reveal).is_err());

    for _ in 0..4 {
        let outcome = ctl.handle(SessionEvent::Next).unwrap();
        if outcome.completed() {
            break;
        }
    }
    assert_eq!(ctl.state(), SessionState::Completed);
    assert_eq!(
        ctl.handle(SessionEvent::Abandon).unwrap(),
        EventOutcome::Navigated(true)
    );
}

//
// ─── FAILING BACKENDS ──────────────────────────────────────────────────────────
//

struct Offline;

#[async_trait]
impl QuestionRepository for Offline {
    async fn fetch(&self, _query: &QuestionQuery) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[async_trait]
impl AttemptRecorder for Offline {
    async fn persist(&self, _attempt: &Attempt) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[async_trait]
impl PerformanceStore for Offline {
    async fn apply_test_result(&self, _result: &TestResult) -> Result<(), StorageError> {
        Err(StorageError::Rejected("read only".into()))
    }

    async fn apply_drill_result(&self, _result: &DrillResult) -> Result<(), StorageError> {
        Err(StorageError::Rejected("read only".into()))
    }
}

#[tokio::test]
async fn persistence_failures_do_not_block_progress() {
    let storage = Storage {
        questions: Arc::new(InMemoryRepository::with_questions(diagnostic_bank())),
        attempts: Arc::new(Offline),
        performance: Arc::new(Offline),
    };
    let mut ctl = SessionController::new(Product::EduTest, &storage);

    ctl.begin(ModeSelection::Diagnostic).await.unwrap();
    let mut result = None;
    while result.is_none() {
        ctl.submit(0).unwrap();
        if let Advance::Completed(done) = ctl.next().unwrap() {
            result = Some(done);
        }
    }

    assert_eq!(result.unwrap().correct_count, 1);
    ctl.settle().await;
    assert_eq!(ctl.in_flight(), 0);
    assert_eq!(ctl.state(), SessionState::Completed);
}

#[tokio::test]
async fn repository_failure_leaves_an_empty_configuration() {
    let storage = Storage {
        questions: Arc::new(Offline),
        attempts: Arc::new(Offline),
        performance: Arc::new(Offline),
    };
    let mut ctl = SessionController::new(Product::EduTest, &storage);

    let err = ctl.configure(ModeSelection::Diagnostic).await.unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::Repository(_))));
    assert_eq!(ctl.state(), SessionState::Configuring);
    assert_eq!(ctl.loaded_questions(), Some(0));
    assert!(matches!(
        ctl.start(),
        Err(SessionError::Load(LoadError::NoQuestions))
    ));
    assert!(ctl.reload().await.is_err());
}
