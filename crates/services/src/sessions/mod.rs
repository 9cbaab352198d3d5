mod controller;
mod events;
mod progress;
mod session;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{Advance, SessionController, SessionState, Submission, TickReport};
pub use events::{EventOutcome, SessionEvent};
pub use progress::SessionProgress;
pub use session::{Feedback, Session};
