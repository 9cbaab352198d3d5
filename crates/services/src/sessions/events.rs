use prep_core::timer::TimerHandle;

use super::controller::{Advance, SessionController, Submission, TickReport};
use super::session::Feedback;
use crate::error::SessionError;

/// Input delivered to a running controller by a front end or a tick source.
///
/// All events for one controller are meant to be funnelled through a single
/// channel so that they are applied strictly one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Submit(usize),
    Reveal,
    Next,
    Previous,
    Abandon,
    Tick(TimerHandle),
}

/// What an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Submitted(Submission),
    Revealed(Feedback),
    Advanced(Advance),
    /// `previous` or `abandon`; `false` means the event was a no-op.
    Navigated(bool),
    Ticked(TickReport),
}

impl EventOutcome {
    /// True when this event ended the session with a result.
    #[must_use]
    pub fn completed(&self) -> bool {
        matches!(
            self,
            EventOutcome::Advanced(Advance::Completed(_))
                | EventOutcome::Ticked(TickReport::SessionExpired(_))
        )
    }
}

impl SessionController {
    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Propagates the error of the corresponding operation; rejected events
    /// leave the controller unchanged.
    pub fn handle(&mut self, event: SessionEvent) -> Result<EventOutcome, SessionError> {
        Ok(match event {
            SessionEvent::Submit(index) => EventOutcome::Submitted(self.submit(index)?),
            SessionEvent::Reveal => EventOutcome::Revealed(self.reveal()?),
            SessionEvent::Next => EventOutcome::Advanced(self.next()?),
            SessionEvent::Previous => EventOutcome::Navigated(self.previous()),
            SessionEvent::Abandon => EventOutcome::Navigated(self.abandon()),
            SessionEvent::Tick(handle) => EventOutcome::Ticked(self.handle_tick(handle)?),
        })
    }
}
