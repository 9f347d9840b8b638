//! Time source abstraction and academic term derivation.
//!
//! # Responsibility
//! - Provide an injectable wall clock so term-boundary behavior is testable.
//! - Derive the active `Term` from a calendar month.
//!
//! # Invariants
//! - January through June map to `Term::Odd`; July through December map to
//!   `Term::Even`.
//! - Terms are derived, never persisted as clock state.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt::{Display, Formatter};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as Unix epoch milliseconds.
    fn now_epoch_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Cell::new(instant),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.instant.set(instant);
    }

    /// Moves the clock forward by `millis`.
    pub fn advance_ms(&self, millis: i64) {
        let next = self.instant.get() + chrono::Duration::milliseconds(millis);
        self.instant.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant.get()
    }
}

/// Half-year offering period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// January through June.
    Odd,
    /// July through December.
    Even,
}

impl Term {
    /// Maps a 1-based calendar month to its term.
    ///
    /// Out-of-range months fall into `Even`, matching the "otherwise" branch
    /// of the calendar rule.
    pub fn for_month(month: u32) -> Self {
        if (1..=6).contains(&month) {
            Self::Odd
        } else {
            Self::Even
        }
    }

    /// Term active at the clock's current instant (UTC calendar).
    pub fn current(clock: &impl Clock) -> Self {
        Self::for_month(clock.now().month())
    }

    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Odd => "odd",
            Self::Even => "even",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "odd" => Some(Self::Odd),
            "even" => Some(Self::Even),
            _ => None,
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, Term};
    use chrono::{TimeZone, Utc};

    fn clock_at(year: i32, month: u32, day: u32, hour: u32) -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap())
    }

    #[test]
    fn first_half_of_year_is_odd() {
        for month in 1..=6 {
            assert_eq!(Term::for_month(month), Term::Odd, "month {month}");
        }
    }

    #[test]
    fn second_half_of_year_is_even() {
        for month in 7..=12 {
            assert_eq!(Term::for_month(month), Term::Even, "month {month}");
        }
    }

    #[test]
    fn june_to_july_boundary_flips_term() {
        let clock = clock_at(2025, 6, 30, 23);
        assert_eq!(Term::current(&clock), Term::Odd);

        clock.advance_ms(60 * 60 * 1000);
        assert_eq!(Term::current(&clock), Term::Even);
    }

    #[test]
    fn december_to_january_boundary_flips_term() {
        let clock = clock_at(2025, 12, 31, 23);
        assert_eq!(Term::current(&clock), Term::Even);

        clock.set(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(Term::current(&clock), Term::Odd);
    }

    #[test]
    fn clock_reference_delegates() {
        let clock = clock_at(2025, 3, 1, 0);
        let by_ref = &clock;
        assert_eq!(by_ref.now_epoch_ms(), clock.now_epoch_ms());
    }

    #[test]
    fn parse_round_trips_labels() {
        assert_eq!(Term::parse(Term::Odd.as_str()), Some(Term::Odd));
        assert_eq!(Term::parse("even"), Some(Term::Even));
        assert_eq!(Term::parse("ganjil"), None);
    }
}
