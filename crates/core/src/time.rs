use chrono::{DateTime, Duration, Utc};

/// Time source for the session engine.
///
/// `Fixed` clocks only move when advanced, which keeps timing-dependent
/// values (time spent per question, session minutes) deterministic in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Whole seconds between two instants, rounded half-up; negative spans clamp to 0.
#[must_use]
pub fn whole_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    round_millis(end.signed_duration_since(start).num_milliseconds(), 1_000)
}

/// Whole minutes between two instants, rounded half-up; negative spans clamp to 0.
#[must_use]
pub fn whole_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    round_millis(end.signed_duration_since(start).num_milliseconds(), 60_000)
}

fn round_millis(millis: i64, unit: i64) -> u32 {
    if millis <= 0 {
        return 0;
    }
    let rounded = millis.saturating_add(unit / 2) / unit;
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_only_when_told() {
        let mut clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(90));
    }

    #[test]
    fn seconds_round_half_up() {
        let start = fixed_now();
        assert_eq!(whole_seconds_between(start, start + Duration::milliseconds(1_499)), 1);
        assert_eq!(whole_seconds_between(start, start + Duration::milliseconds(1_500)), 2);
        assert_eq!(whole_seconds_between(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn minutes_round_half_up() {
        let start = fixed_now();
        assert_eq!(whole_minutes_between(start, start + Duration::seconds(29)), 0);
        assert_eq!(whole_minutes_between(start, start + Duration::seconds(30)), 1);
        assert_eq!(whole_minutes_between(start, start + Duration::seconds(150)), 3);
    }
}
