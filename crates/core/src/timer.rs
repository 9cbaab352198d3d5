//! Countdown bookkeeping for per-question and per-session limits.
//!
//! This module holds no clocks and spawns nothing: a driver delivers one
//! tick per elapsed second, tagged with the `TimerHandle` it was armed with.
//! Restarting or cancelling a countdown bumps its generation, so ticks that
//! were already in flight for the old countdown are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which countdown a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    Question,
    Session,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Question => f.write_str("question"),
            TimerKind::Session => f.write_str("session"),
        }
    }
}

/// Identity of one armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    kind: TimerKind,
    generation: u64,
}

impl TimerHandle {
    #[must_use]
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a cancelled, replaced or already expired countdown.
    Stale,
    /// The countdown is still running with this many seconds left.
    Running { remaining_secs: u32 },
    /// The countdown just reached zero. Reported once per countdown.
    Expired(TimerKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    handle: TimerHandle,
    remaining_secs: u32,
    expired: bool,
}

/// Up to two independent countdowns, one per `TimerKind`.
#[derive(Debug, Default, Clone)]
pub struct TimerSet {
    question: Option<Countdown>,
    session: Option<Countdown>,
    next_generation: u64,
}

impl TimerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Countdown> {
        match kind {
            TimerKind::Question => &mut self.question,
            TimerKind::Session => &mut self.session,
        }
    }

    fn slot(&self, kind: TimerKind) -> Option<&Countdown> {
        match kind {
            TimerKind::Question => self.question.as_ref(),
            TimerKind::Session => self.session.as_ref(),
        }
    }

    /// Arm a countdown of `duration_secs`, replacing any countdown of the same kind.
    ///
    /// A zero duration is treated as one second so the countdown still expires
    /// through a tick rather than synchronously.
    pub fn start(&mut self, kind: TimerKind, duration_secs: u32) -> TimerHandle {
        self.next_generation = self.next_generation.wrapping_add(1);
        let handle = TimerHandle {
            kind,
            generation: self.next_generation,
        };
        *self.slot_mut(kind) = Some(Countdown {
            handle,
            remaining_secs: duration_secs.max(1),
            expired: false,
        });
        handle
    }

    /// Cancel the countdown of the given kind, returning its handle if one was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> Option<TimerHandle> {
        self.slot_mut(kind).take().map(|c| c.handle)
    }

    /// Cancel every countdown.
    pub fn cancel_all(&mut self) -> Vec<TimerHandle> {
        [TimerKind::Question, TimerKind::Session]
            .into_iter()
            .filter_map(|kind| self.cancel(kind))
            .collect()
    }

    /// Apply one elapsed second to the countdown identified by `handle`.
    pub fn tick(&mut self, handle: TimerHandle) -> TickOutcome {
        let Some(countdown) = self.slot_mut(handle.kind).as_mut() else {
            return TickOutcome::Stale;
        };
        if countdown.handle != handle || countdown.expired {
            return TickOutcome::Stale;
        }

        countdown.remaining_secs = countdown.remaining_secs.saturating_sub(1);
        if countdown.remaining_secs == 0 {
            countdown.expired = true;
            TickOutcome::Expired(handle.kind)
        } else {
            TickOutcome::Running {
                remaining_secs: countdown.remaining_secs,
            }
        }
    }

    /// Seconds left on the countdown of `kind`, if one is armed.
    #[must_use]
    pub fn remaining(&self, kind: TimerKind) -> Option<u32> {
        self.slot(kind).map(|c| c.remaining_secs)
    }

    /// Handle of the live (armed and not yet expired) countdown of `kind`.
    #[must_use]
    pub fn active(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.slot(kind).filter(|c| !c.expired).map(|c| c.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let mut timers = TimerSet::new();
        let handle = timers.start(TimerKind::Question, 3);

        assert_eq!(timers.tick(handle), TickOutcome::Running { remaining_secs: 2 });
        assert_eq!(timers.tick(handle), TickOutcome::Running { remaining_secs: 1 });
        assert_eq!(timers.tick(handle), TickOutcome::Expired(TimerKind::Question));
        assert_eq!(timers.tick(handle), TickOutcome::Stale);
        assert_eq!(timers.remaining(TimerKind::Question), Some(0));
        assert_eq!(timers.active(TimerKind::Question), None);
    }

    #[test]
    fn restart_makes_old_handle_stale() {
        let mut timers = TimerSet::new();
        let old = timers.start(TimerKind::Question, 2);
        let new = timers.start(TimerKind::Question, 60);

        assert_ne!(old, new);
        assert_eq!(timers.tick(old), TickOutcome::Stale);
        assert_eq!(timers.tick(new), TickOutcome::Running { remaining_secs: 59 });
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = TimerSet::new();
        let handle = timers.start(TimerKind::Session, 1);
        assert_eq!(timers.cancel(TimerKind::Session), Some(handle));
        assert_eq!(timers.tick(handle), TickOutcome::Stale);
        assert_eq!(timers.remaining(TimerKind::Session), None);
    }

    #[test]
    fn kinds_are_independent() {
        let mut timers = TimerSet::new();
        let question = timers.start(TimerKind::Question, 60);
        let session = timers.start(TimerKind::Session, 3_600);

        timers.tick(question);
        assert_eq!(timers.remaining(TimerKind::Question), Some(59));
        assert_eq!(timers.remaining(TimerKind::Session), Some(3_600));

        let cancelled = timers.cancel_all();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(timers.tick(session), TickOutcome::Stale);
    }
}
