mod attempt;
mod ids;
mod mode;
mod product;
mod question;
mod result;

pub use ids::{ParseIdError, QuestionId, SessionId};

pub use attempt::Attempt;
pub use mode::{FeedbackTiming, SessionMode};
pub use product::{Product, UnknownProduct, normalize_test_type};
pub use question::{Question, QuestionDraft, QuestionError};
pub use result::{DrillResult, ResultHeader, TestResult};
