use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use prep_core::Clock;
use prep_core::model::{
    Attempt, DrillResult, FeedbackTiming, Product, Question, ResultHeader, SessionMode, TestResult,
};
use prep_core::scoring;
use prep_core::time::whole_minutes_between;
use prep_core::timer::{TickOutcome, TimerHandle, TimerKind, TimerSet};
use storage::{PerformanceStore, QuestionRepository, Storage};

use super::progress::SessionProgress;
use super::session::{Feedback, QuestionStage, Session};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::{LoadError, Rejection, SessionError};
use crate::policy::{ModePolicy, ModeSelection};
use crate::recorder::AnswerRecorder;
use crate::ticker::TickSink;

//
// ─── PUBLIC STATE ──────────────────────────────────────────────────────────────
//

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Mode selected, question set resolved (possibly empty), awaiting start.
    Configuring,
    /// A question is open for answering.
    InProgress,
    /// The current question has been answered; feedback may still be hidden.
    Feedback,
    /// Result emitted; terminal until abandoned.
    Completed,
}

/// Effect of a successful `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Immediate-feedback modes: correctness is shown right away.
    Revealed(Feedback),
    /// Deferred-feedback mode: the answer is captured but hidden until `reveal`.
    Staged,
}

/// Effect of a successful `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { index: usize },
    Completed(TestResult),
}

/// Effect of a delivered timer tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// Tick for a countdown that no longer exists; nothing changed.
    Stale,
    Running { kind: TimerKind, remaining_secs: u32 },
    /// The question countdown ran out and the question was submitted unanswered.
    QuestionExpired(Attempt),
    /// The session countdown ran out and the session was completed.
    SessionExpired(TestResult),
}

struct Configured {
    policy: ModePolicy,
    questions: Vec<Question>,
}

enum Phase {
    Idle,
    Configuring(Configured),
    Running(Session),
    Completed(TestResult),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// State machine driving one question session at a time.
///
/// Every transition runs to completion synchronously; the only suspension
/// points are question-set loading in [`configure`](Self::configure) and
/// [`reload`](Self::reload). Attempts and results leave through a
/// [`Dispatcher`] and never block or fail a transition.
pub struct SessionController {
    product: Product,
    config: EngineConfig,
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    answers: AnswerRecorder,
    performance: Arc<dyn PerformanceStore>,
    dispatcher: Dispatcher,
    timers: TimerSet,
    ticker: Option<Arc<dyn TickSink>>,
    phase: Phase,
}

impl SessionController {
    #[must_use]
    pub fn new(product: Product, storage: &Storage) -> Self {
        Self {
            product,
            config: EngineConfig::default(),
            clock: Clock::default(),
            questions: Arc::clone(&storage.questions),
            answers: AnswerRecorder::new(Arc::clone(&storage.attempts)),
            performance: Arc::clone(&storage.performance),
            dispatcher: Dispatcher::new(),
            timers: TimerSet::new(),
            ticker: None,
            phase: Phase::Idle,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a real-time tick source. Without one, ticks must be fed through
    /// [`handle_tick`](Self::handle_tick) by the caller.
    #[must_use]
    pub fn with_ticker(mut self, ticker: Arc<dyn TickSink>) -> Self {
        self.ticker = Some(ticker);
        self
    }

    /// Mutable access to the clock, e.g. to advance a fixed clock in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn product(&self) -> Product {
        self.product
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Switch product. Any session in flight is abandoned.
    pub fn set_product(&mut self, product: Product) {
        if product != self.product {
            self.abandon();
            info!(product = product.slug(), "product switched");
            self.product = product;
        }
    }

    //
    // ─── INTROSPECTION ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn state(&self) -> SessionState {
        match &self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Configuring(_) => SessionState::Configuring,
            Phase::Running(session) => match session.stage() {
                QuestionStage::Answering => SessionState::InProgress,
                QuestionStage::AwaitingReveal | QuestionStage::Revealed => SessionState::Feedback,
            },
            Phase::Completed(_) => SessionState::Completed,
        }
    }

    /// The running session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Running(session) => Some(session),
            _ => None,
        }
    }

    /// Policy of the configured or running session.
    #[must_use]
    pub fn policy(&self) -> Option<&ModePolicy> {
        match &self.phase {
            Phase::Configuring(configured) => Some(&configured.policy),
            Phase::Running(session) => Some(session.policy()),
            Phase::Idle | Phase::Completed(_) => None,
        }
    }

    /// Number of questions resolved for the configured session.
    #[must_use]
    pub fn loaded_questions(&self) -> Option<usize> {
        match &self.phase {
            Phase::Configuring(configured) => Some(configured.questions.len()),
            Phase::Running(session) => Some(session.questions().len()),
            Phase::Idle | Phase::Completed(_) => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.session().map(Session::current_question)
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.session().and_then(Session::feedback)
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session().map(Session::progress)
    }

    /// Seconds left on the given countdown, if it is armed.
    #[must_use]
    pub fn time_left(&self, kind: TimerKind) -> Option<u32> {
        self.timers.remaining(kind)
    }

    /// Handle of the live countdown of `kind`, for callers that deliver ticks themselves.
    #[must_use]
    pub fn active_timer(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.timers.active(kind)
    }

    /// Result of the completed session.
    #[must_use]
    pub fn result(&self) -> Option<&TestResult> {
        match &self.phase {
            Phase::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Number of persistence jobs still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Wait for outstanding attempt/result persistence. Never required for progress.
    pub async fn settle(&mut self) {
        self.dispatcher.settle().await;
    }

    //
    // ─── CONFIGURATION ─────────────────────────────────────────────────────────
    //

    /// Select a mode and resolve its question set.
    ///
    /// Any session in flight is abandoned first. On success the controller is
    /// in `Configuring` and the number of loaded questions is returned; zero
    /// questions is a valid outcome, but `start` will refuse it.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Repository` if the repository fails; the controller
    /// then stays in `Configuring` with no questions, and [`reload`](Self::reload)
    /// may be used to retry.
    pub async fn configure(&mut self, selection: ModeSelection) -> Result<usize, SessionError> {
        self.abandon();
        let policy = ModePolicy::resolve(self.product, &selection, &self.config);
        debug!(mode = %policy.mode, test_name = %policy.test_name, "mode selected");
        self.phase = Phase::Configuring(Configured {
            policy,
            questions: Vec::new(),
        });
        self.reload().await
    }

    /// Fetch the question set of the configured mode again.
    ///
    /// # Errors
    ///
    /// Returns `Rejection` outside `Configuring` and `LoadError::Repository`
    /// on repository failure.
    pub async fn reload(&mut self) -> Result<usize, SessionError> {
        let query = match &self.phase {
            Phase::Configuring(configured) => configured.policy.query.clone(),
            _ => return self.reject(self.not_configurable()),
        };

        let fetched = self.questions.fetch(&query).await;

        let Phase::Configuring(configured) = &mut self.phase else {
            return self.reject(Rejection::NoSession);
        };
        match fetched {
            Ok(questions) => {
                let count = questions.len();
                configured.questions = questions;
                if count == 0 {
                    info!(mode = %configured.policy.mode, "no questions available");
                } else {
                    debug!(mode = %configured.policy.mode, count, "question set resolved");
                }
                Ok(count)
            }
            Err(error) => {
                configured.questions.clear();
                warn!(mode = %configured.policy.mode, %error, "question set failed to load");
                Err(LoadError::Repository(error).into())
            }
        }
    }

    /// Enter `InProgress` on the first question of the configured set.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NoQuestions` for an empty set (state unchanged)
    /// and `Rejection` outside `Configuring`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match &self.phase {
            Phase::Configuring(configured) if configured.questions.is_empty() => {
                debug!("start refused: empty question set");
                return Err(LoadError::NoQuestions.into());
            }
            Phase::Configuring(_) => {}
            _ => return self.reject(self.not_configurable()),
        }

        let Phase::Configuring(configured) = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return self.reject(Rejection::NoSession);
        };

        let now = self.clock.now();
        let session = Session::new(configured.policy, configured.questions, now);
        info!(
            session_id = %session.id(),
            mode = %session.mode(),
            questions = session.questions().len(),
            "session started"
        );

        if let Some(secs) = session.policy().session_time_limit_secs {
            self.arm(TimerKind::Session, secs);
        }
        if let Some(secs) = session.policy().question_time_limit_secs {
            self.arm(TimerKind::Question, secs);
        }
        self.phase = Phase::Running(session);
        Ok(())
    }

    /// Configure and immediately start, as diagnostic and practice flows do.
    ///
    /// # Errors
    ///
    /// See [`configure`](Self::configure) and [`start`](Self::start).
    pub async fn begin(&mut self, selection: ModeSelection) -> Result<(), SessionError> {
        self.configure(selection).await?;
        self.start()
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Answer the current question with option `index`.
    ///
    /// # Errors
    ///
    /// Returns `Rejection` when no question is open, the question was already
    /// answered or staged, or `index` is out of range. State is unchanged.
    pub fn submit(&mut self, index: usize) -> Result<Submission, SessionError> {
        let rejection = match &self.phase {
            Phase::Running(session) => match session.stage() {
                QuestionStage::AwaitingReveal => Some(Rejection::AwaitingReveal),
                QuestionStage::Revealed => Some(Rejection::AlreadyAnswered),
                QuestionStage::Answering if session.is_answered(session.current_index()) => {
                    Some(Rejection::AlreadyAnswered)
                }
                QuestionStage::Answering => {
                    let question = session.current_question();
                    (!question.has_option(index)).then(|| Rejection::OptionOutOfRange {
                        index,
                        len: question.options().len(),
                    })
                }
            },
            _ => Some(self.not_running()),
        };
        if let Some(rejection) = rejection {
            return self.reject(rejection);
        }

        let feedback = self.answer_current(Some(index), false);
        Ok(match feedback {
            Some(feedback) => Submission::Revealed(feedback),
            None => Submission::Staged,
        })
    }

    /// Show feedback for a staged answer (deferred-feedback mode).
    ///
    /// # Errors
    ///
    /// Returns `Rejection::NothingToReveal` unless an answer is staged.
    pub fn reveal(&mut self) -> Result<Feedback, SessionError> {
        let Phase::Running(session) = &mut self.phase else {
            let rejection = self.not_running();
            return self.reject(rejection);
        };
        if session.stage() != QuestionStage::AwaitingReveal {
            return self.reject(Rejection::NothingToReveal);
        }
        session.reveal();
        match session.feedback() {
            Some(feedback) => Ok(feedback),
            None => self.reject(Rejection::NothingToReveal),
        }
    }

    /// Capture an attempt for the current question and update the session.
    ///
    /// Returns the feedback when it becomes visible.
    fn answer_current(&mut self, selected: Option<usize>, force_reveal: bool) -> Option<Feedback> {
        self.disarm(TimerKind::Question);
        let now = self.clock.now();
        let test_type = self.product.test_type();

        let Phase::Running(session) = &mut self.phase else {
            return None;
        };
        let attempt = self.answers.record(
            &mut self.dispatcher,
            session.current_question(),
            test_type,
            selected,
            session.question_started_at(),
            now,
        );
        let stage = match session.policy().feedback {
            FeedbackTiming::Deferred if !force_reveal => QuestionStage::AwaitingReveal,
            FeedbackTiming::Deferred | FeedbackTiming::Immediate => QuestionStage::Revealed,
        };
        session.store_attempt(attempt, stage);
        session.feedback()
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Leave the current question: advance, or complete the session on the last one.
    ///
    /// An unanswered question may be skipped; it counts as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `Rejection` when no session is running (including after completion).
    pub fn next(&mut self) -> Result<Advance, SessionError> {
        let now = self.clock.now();
        let Phase::Running(session) = &mut self.phase else {
            let rejection = self.not_running();
            return self.reject(rejection);
        };

        if session.is_last() {
            return self.finish().map(Advance::Completed);
        }

        let index = session.current_index() + 1;
        session.move_to(index, now);
        let rearm = !session.is_answered(index);
        let limit = session.policy().question_time_limit_secs;
        self.rearm_question_timer(limit.filter(|_| rearm));
        debug!(index, "moved to next question");
        Ok(Advance::Moved { index })
    }

    /// Go back one question. No-op (returns `false`) on the first question or
    /// when no session is running. Counts and answered flags are untouched.
    pub fn previous(&mut self) -> bool {
        let now = self.clock.now();
        let Phase::Running(session) = &mut self.phase else {
            return false;
        };
        if session.current_index() == 0 {
            return false;
        }

        let index = session.current_index() - 1;
        session.move_to(index, now);
        let rearm = !session.is_answered(index);
        let limit = session.policy().question_time_limit_secs;
        self.rearm_question_timer(limit.filter(|_| rearm));
        debug!(index, "moved to previous question");
        true
    }

    /// Discard any configured, running or completed session and return to `Idle`.
    ///
    /// Emits neither attempts nor a result. Returns `false` if already idle.
    pub fn abandon(&mut self) -> bool {
        self.disarm_all();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => false,
            Phase::Running(session) => {
                info!(
                    session_id = %session.id(),
                    answered = session.progress().answered,
                    "session abandoned"
                );
                true
            }
            Phase::Configuring(_) | Phase::Completed(_) => true,
        }
    }

    //
    // ─── TIMERS ────────────────────────────────────────────────────────────────
    //

    /// Apply one elapsed second to the countdown identified by `handle`.
    ///
    /// Ticks for superseded countdowns are reported as `Stale` and change nothing.
    ///
    /// # Errors
    ///
    /// Only propagates scoring failures when a session expiry completes the session.
    pub fn handle_tick(&mut self, handle: TimerHandle) -> Result<TickReport, SessionError> {
        match self.timers.tick(handle) {
            TickOutcome::Stale => Ok(TickReport::Stale),
            TickOutcome::Running { remaining_secs } => Ok(TickReport::Running {
                kind: handle.kind(),
                remaining_secs,
            }),
            TickOutcome::Expired(TimerKind::Question) => {
                self.disarm(TimerKind::Question);
                let open = matches!(
                    &self.phase,
                    Phase::Running(s) if s.stage() == QuestionStage::Answering
                        && !s.is_answered(s.current_index())
                );
                if !open {
                    return Ok(TickReport::Stale);
                }
                self.answer_current(None, true);
                let attempt = self
                    .session()
                    .and_then(|s| s.attempts()[s.current_index()].clone());
                info!("question time expired");
                Ok(attempt.map_or(TickReport::Stale, TickReport::QuestionExpired))
            }
            TickOutcome::Expired(TimerKind::Session) => {
                if !matches!(self.phase, Phase::Running(_)) {
                    self.disarm(TimerKind::Session);
                    return Ok(TickReport::Stale);
                }
                info!("session time expired");
                self.finish().map(TickReport::SessionExpired)
            }
        }
    }

    fn arm(&mut self, kind: TimerKind, secs: u32) {
        self.disarm(kind);
        let handle = self.timers.start(kind, secs);
        if let Some(ticker) = &self.ticker {
            ticker.arm(handle);
        }
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timers.cancel(kind) {
            if let Some(ticker) = &self.ticker {
                ticker.disarm(handle);
            }
        }
    }

    fn disarm_all(&mut self) {
        for handle in self.timers.cancel_all() {
            if let Some(ticker) = &self.ticker {
                ticker.disarm(handle);
            }
        }
    }

    fn rearm_question_timer(&mut self, limit: Option<u32>) {
        match limit {
            Some(secs) => self.arm(TimerKind::Question, secs),
            None => self.disarm(TimerKind::Question),
        }
    }

    //
    // ─── COMPLETION ────────────────────────────────────────────────────────────
    //

    /// Aggregate the running session, hand the result off, and enter `Completed`.
    fn finish(&mut self) -> Result<TestResult, SessionError> {
        self.disarm_all();
        let Phase::Running(session) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return self.reject(Rejection::NotStarted);
        };

        let completed_at = self.clock.now();
        let minutes = whole_minutes_between(session.started_at(), completed_at);
        let card = match scoring::aggregate(session.questions(), &session.outcomes(), minutes) {
            Ok(card) => card,
            Err(error) => {
                warn!(session_id = %session.id(), %error, "session could not be scored");
                return Err(error.into());
            }
        };

        let policy = session.policy();
        let header = ResultHeader {
            session_id: session.id(),
            product: self.product.slug().to_owned(),
            mode: policy.mode,
            test_name: policy.test_name.clone(),
            completed_at,
        };
        let result = TestResult::new(header, card);

        let performance = Arc::clone(&self.performance);
        match (policy.mode, &policy.drill) {
            (SessionMode::Drill, Some(target)) => {
                let drill = DrillResult {
                    topic: target.topic.clone(),
                    sub_skill: target.sub_skill.clone(),
                    correct_count: result.correct_count,
                    total_count: result.total_questions,
                    time_spent_minutes: result.time_spent_minutes,
                };
                self.dispatcher.dispatch("drill result", async move {
                    performance.apply_drill_result(&drill).await
                });
            }
            _ => {
                let outgoing = result.clone();
                self.dispatcher.dispatch("test result", async move {
                    performance.apply_test_result(&outgoing).await
                });
            }
        }

        info!(
            session_id = %result.session_id,
            mode = %result.mode,
            score = result.score,
            correct = result.correct_count,
            total = result.total_questions,
            "session completed"
        );
        self.phase = Phase::Completed(result.clone());
        Ok(result)
    }

    //
    // ─── REJECTIONS ────────────────────────────────────────────────────────────
    //

    fn not_running(&self) -> Rejection {
        match self.phase {
            Phase::Idle => Rejection::NoSession,
            Phase::Configuring(_) => Rejection::NotStarted,
            Phase::Running(_) => Rejection::AlreadyStarted,
            Phase::Completed(_) => Rejection::Completed,
        }
    }

    fn not_configurable(&self) -> Rejection {
        match self.phase {
            Phase::Running(_) => Rejection::AlreadyStarted,
            Phase::Completed(_) => Rejection::Completed,
            Phase::Idle | Phase::Configuring(_) => Rejection::NoSession,
        }
    }

    #[allow(clippy::unused_self)]
    fn reject<T>(&self, rejection: Rejection) -> Result<T, SessionError> {
        debug!(%rejection, "transition rejected");
        Err(rejection.into())
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("product", &self.product)
            .field("state", &self.state())
            .field("session", &self.session())
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}
