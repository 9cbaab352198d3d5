use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use prep_core::model::{FeedbackTiming, Product, SessionMode, TestResult};
use prep_core::timer::TimerKind;
use services::{
    Advance, EngineConfig, EventOutcome, Feedback, ModeSelection, SessionController, SessionEvent,
    Submission, TickReport, TokioTicker,
};
use storage::{InMemoryRepository, Storage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const ENV_BANK: &str = "PREP_BANK";
const ENV_PRODUCT: &str = "PREP_PRODUCT";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingBank,
    InvalidProduct { raw: String },
    InvalidMode { raw: String },
    MissingSubSkill,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingBank => {
                write!(f, "a question bank is required (--bank or {ENV_BANK})")
            }
            ArgsError::InvalidProduct { raw } => write!(f, "invalid --product value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::MissingSubSkill => write!(f, "--mode drill requires --sub-skill"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  prep --bank <questions.json> [--product <slug>] [--mode <mode>]");
    eprintln!("       [--set <practice_N>] [--topic <topic>] [--sub-skill <sub-skill>] [--deferred]");
    eprintln!();
    eprintln!("Modes: diagnostic (default), practice, drill");
    eprintln!("Products: {}", product_slugs());
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --product edutest");
    eprintln!("  --set practice_1");
    eprintln!();
    eprintln!("While running: a-z answer, s reveal, n next, p previous, q quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {ENV_BANK}, {ENV_PRODUCT}, PREP_QUESTION_TIME_LIMIT_SECS,");
    eprintln!("  PREP_SESSION_TIME_LIMIT_SECS, PREP_DRILL_QUESTION_CAP, RUST_LOG");
}

fn product_slugs() -> String {
    Product::ALL
        .iter()
        .map(|p| p.slug())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    bank: PathBuf,
    product: Product,
    mode: SessionMode,
    set_id: String,
    topic: Option<String>,
    sub_skill: Option<String>,
    deferred: bool,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut bank = env(ENV_BANK).map(PathBuf::from);
        let mut product = match env(ENV_PRODUCT) {
            Some(raw) => parse_product(raw)?,
            None => Product::default(),
        };
        let mut mode = SessionMode::Diagnostic;
        let mut set_id = services::PRACTICE_SETS[0].to_owned();
        let mut topic = None;
        let mut sub_skill = None;
        let mut deferred = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => bank = Some(PathBuf::from(require_value(args, "--bank")?)),
                "--product" => product = parse_product(require_value(args, "--product")?)?,
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    mode = match value.as_str() {
                        "diagnostic" => SessionMode::Diagnostic,
                        "practice" => SessionMode::Practice,
                        "drill" => SessionMode::Drill,
                        _ => return Err(ArgsError::InvalidMode { raw: value }),
                    };
                }
                "--set" => set_id = require_value(args, "--set")?,
                "--topic" => topic = Some(require_value(args, "--topic")?),
                "--sub-skill" => sub_skill = Some(require_value(args, "--sub-skill")?),
                "--deferred" => deferred = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if mode == SessionMode::Drill && sub_skill.is_none() {
            return Err(ArgsError::MissingSubSkill);
        }

        Ok(Self {
            bank: bank.ok_or(ArgsError::MissingBank)?,
            product,
            mode,
            set_id,
            topic,
            sub_skill,
            deferred,
        })
    }

    fn selection(&self) -> ModeSelection {
        match self.mode {
            SessionMode::Diagnostic => ModeSelection::Diagnostic,
            SessionMode::Practice => ModeSelection::practice(self.set_id.clone()),
            SessionMode::Drill => {
                let sub_skill = self.sub_skill.clone().unwrap_or_default();
                ModeSelection::Drill {
                    topic: self.topic.clone().unwrap_or_else(|| sub_skill.clone()),
                    sub_skill,
                    feedback: if self.deferred {
                        FeedbackTiming::Deferred
                    } else {
                        FeedbackTiming::Immediate
                    },
                }
            }
        }
    }
}

fn parse_product(raw: String) -> Result<Product, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidProduct { raw })
}

/// Map one line of terminal input to an event. Reserved letters win over option letters.
fn parse_input(line: &str) -> Option<SessionEvent> {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        "s" => Some(SessionEvent::Reveal),
        "n" => Some(SessionEvent::Next),
        "p" => Some(SessionEvent::Previous),
        "q" => Some(SessionEvent::Abandon),
        _ => {
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(letter @ 'a'..='z'), None) => {
                    Some(SessionEvent::Submit(usize::from(letter as u8 - b'a')))
                }
                _ => None,
            }
        }
    }
}

fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'a'.checked_add(i))
        .map_or('?', char::from)
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render_question(ctl: &SessionController) {
    let (Some(question), Some(progress)) = (ctl.current_question(), ctl.progress()) else {
        return;
    };
    println!();
    print!("Question {} of {}", progress.position(), progress.total);
    if let Some(secs) = ctl.time_left(TimerKind::Session) {
        print!("  [{}:{:02} left]", secs / 60, secs % 60);
    }
    if let Some(secs) = ctl.time_left(TimerKind::Question) {
        print!("  [{secs}s]");
    }
    println!();
    println!("{}", question.prompt());
    for (index, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", option_letter(index));
    }
    if ctl.session().is_some_and(|s| s.is_answered(s.current_index())) {
        println!("(already answered)");
    }
}

fn render_feedback(feedback: &Feedback) {
    if feedback.is_correct {
        println!("Correct.");
    } else {
        match feedback.selected_option {
            Some(_) => println!(
                "Incorrect. The answer is {}.",
                option_letter(feedback.correct_option)
            ),
            None => println!(
                "Time is up. The answer is {}.",
                option_letter(feedback.correct_option)
            ),
        }
    }
    if let Some(explanation) = &feedback.explanation {
        println!("{explanation}");
    }
}

fn render_result(result: &TestResult) {
    println!();
    println!("{}", result.test_name);
    println!(
        "Score: {}% ({} of {} correct) in {} min",
        result.score, result.correct_count, result.total_questions, result.time_spent_minutes
    );
    for (topic, pct) in &result.topic_results {
        println!("  {topic}: {pct}%");
    }
    if result.sub_skill_results.len() > 1 {
        println!("Sub-skills:");
        for (sub_skill, pct) in &result.sub_skill_results {
            println!("  {sub_skill}: {pct}%");
        }
    }
}

//
// ─── EVENT LOOP ────────────────────────────────────────────────────────────────
//

fn spawn_stdin_reader(tx: UnboundedSender<SessionEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_input(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                None => eprintln!("a-z answer, s reveal, n next, p previous, q quit"),
            }
        }
        let _ = tx.send(SessionEvent::Abandon);
    });
}

/// Returns true when the loop should stop.
fn present(ctl: &SessionController, outcome: &EventOutcome) -> bool {
    match outcome {
        EventOutcome::Submitted(Submission::Revealed(feedback)) | EventOutcome::Revealed(feedback) => {
            render_feedback(feedback);
        }
        EventOutcome::Submitted(Submission::Staged) => println!("Answer saved. Press s to reveal."),
        EventOutcome::Advanced(Advance::Moved { .. }) | EventOutcome::Navigated(true) => {
            render_question(ctl);
        }
        EventOutcome::Navigated(false) => {}
        EventOutcome::Advanced(Advance::Completed(result))
        | EventOutcome::Ticked(TickReport::SessionExpired(result)) => {
            render_result(result);
            return true;
        }
        EventOutcome::Ticked(TickReport::QuestionExpired(_)) => {
            if let Some(feedback) = ctl.feedback() {
                render_feedback(&feedback);
            }
        }
        EventOutcome::Ticked(TickReport::Running {
            kind,
            remaining_secs,
        }) => {
            let announce = match kind {
                TimerKind::Question => *remaining_secs <= 5,
                TimerKind::Session => {
                    *remaining_secs % 300 == 0 || (*remaining_secs <= 60 && *remaining_secs % 15 == 0)
                }
            };
            if announce {
                println!("[{kind} time left: {remaining_secs}s]");
            }
        }
        EventOutcome::Ticked(TickReport::Stale) => {}
    }
    false
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1).peekable();
    if argv
        .peek()
        .is_some_and(|first| first == "--help" || first == "-h")
    {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(&mut argv, |var| std::env::var(var).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = EngineConfig::from_env()?;
    let bank = std::fs::read_to_string(&args.bank)?;
    let repo = InMemoryRepository::from_json(&bank)?;
    let storage = Storage::from_memory(repo.clone());
    info!(bank = %args.bank.display(), product = args.product.slug(), "question bank loaded");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ticker = Arc::new(TokioTicker::new(tx.clone()));
    let mut ctl = SessionController::new(args.product, &storage)
        .with_config(config)
        .with_ticker(ticker);

    ctl.begin(args.selection()).await?;
    if let Some(policy) = ctl.policy() {
        println!("{} ({})", policy.test_name, args.product.name());
    }
    render_question(&ctl);

    spawn_stdin_reader(tx);
    while let Some(event) = rx.recv().await {
        let quitting = event == SessionEvent::Abandon;
        match ctl.handle(event) {
            Ok(outcome) if quitting => {
                debug!(?outcome, "quit requested");
                println!("Session abandoned.");
                break;
            }
            Ok(outcome) => {
                if present(&ctl, &outcome) {
                    break;
                }
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    ctl.settle().await;
    let attempts = repo.attempts()?.len();
    debug!(attempts, "session persisted");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
