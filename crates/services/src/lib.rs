#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod policy;
pub mod recorder;
pub mod sessions;
pub mod ticker;

pub use prep_core::Clock;
pub use sessions as session;

pub use config::EngineConfig;
pub use dispatch::Dispatcher;
pub use error::{ConfigError, LoadError, Rejection, SessionError};
pub use policy::{DrillTarget, ModePolicy, ModeSelection, PRACTICE_SETS};
pub use recorder::{AnswerRecorder, capture_attempt};
pub use ticker::{TickSink, TokioTicker};

pub use sessions::{
    Advance, EventOutcome, Feedback, Session, SessionController, SessionEvent, SessionProgress,
    SessionState, Submission, TickReport,
};
