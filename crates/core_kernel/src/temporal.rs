//! Rental periods and clocks
//!
//! A rental period is a half-open interval `[start, end)`: a booking ending at
//! 12:00 and another starting at 12:00 do not overlap.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

/// Milliseconds in one hour
pub const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Period starts in the past: {start} is before {now}")]
    StartsInPast {
        start: String,
        now: String,
    },
}

/// A half-open rental interval `[start, end)`
///
/// Construction guarantees `start < end`, so every downstream consumer
/// (availability checks, pricing) can rely on a strictly positive duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct RentalPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawPeriod> for RentalPeriod {
    type Error = TemporalError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        RentalPeriod::new(raw.start, raw.end)
    }
}

impl RentalPeriod {
    /// Creates a new rental period, rejecting empty or inverted intervals
    ///
    /// Both bounds are truncated to whole milliseconds first, so a period
    /// shorter than one millisecond is empty.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        let start = start.trunc_subsecs(3);
        let end = end.trunc_subsecs(3);
        if start >= end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a period of the given length starting at `start`
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self, TemporalError> {
        Self::new(start, start + length)
    }

    /// Start of the period (inclusive)
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the period (exclusive)
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if the timestamp falls inside `[start, end)`
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Returns true if the two periods share at least one instant
    pub fn overlaps(&self, other: &RentalPeriod) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the length of the period
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns the length of the period in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.duration().num_milliseconds()
    }

    /// Rejects periods that start before `now`; starting exactly at `now` is allowed
    pub fn ensure_not_in_past(&self, now: DateTime<Utc>) -> Result<(), TemporalError> {
        let now = now.trunc_subsecs(3);
        if self.start < now {
            return Err(TemporalError::StartsInPast {
                start: self.start.to_rfc3339(),
                now: now.to_rfc3339(),
            });
        }
        Ok(())
    }
}

/// Source of the current time
///
/// Services take a clock instead of calling `Utc::now()` so that boundary
/// behavior ("starts exactly now") can be tested deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a settable instant, for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `at` (millisecond precision)
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// Moves the clock to a new instant
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Advances the clock by `by`
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted_periods() {
        assert!(RentalPeriod::new(at(10), at(10)).is_err());
        assert!(RentalPeriod::new(at(12), at(10)).is_err());
        assert!(RentalPeriod::new(at(10), at(11)).is_ok());
    }

    #[test]
    fn test_back_to_back_periods_do_not_overlap() {
        let morning = RentalPeriod::new(at(10), at(12)).unwrap();
        let afternoon = RentalPeriod::new(at(12), at(14)).unwrap();
        assert!(!morning.overlaps(&afternoon));
        assert!(!afternoon.overlaps(&morning));
    }

    #[test]
    fn test_partial_overlap() {
        let a = RentalPeriod::new(at(10), at(12)).unwrap();
        let b = RentalPeriod::new(at(11), at(13)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_contains_is_half_open() {
        let period = RentalPeriod::new(at(10), at(12)).unwrap();
        assert!(period.contains(at(10)));
        assert!(!period.contains(at(12)));
    }

    #[test]
    fn test_starting_exactly_now_is_not_in_the_past() {
        let period = RentalPeriod::new(at(10), at(12)).unwrap();
        assert!(period.ensure_not_in_past(at(10)).is_ok());
        assert!(period.ensure_not_in_past(at(11)).is_err());
    }

    #[test]
    fn test_deserialize_validates_order() {
        let json = r#"{"start":"2030-06-01T12:00:00Z","end":"2030-06-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<RentalPeriod>(json).is_err());
    }

    #[test]
    fn test_sub_millisecond_period_is_empty() {
        let start = at(10);
        assert!(RentalPeriod::new(start, start + Duration::microseconds(500)).is_err());
        assert!(RentalPeriod::new(start, start + Duration::nanoseconds(999_999)).is_err());

        let period = RentalPeriod::new(
            start + Duration::nanoseconds(250),
            start + Duration::microseconds(1_500),
        )
        .unwrap();
        assert_eq!(period.start(), start);
        assert_eq!(period.duration_millis(), 1);
    }

    #[test]
    fn test_start_within_the_current_millisecond_is_not_in_the_past() {
        let now = at(10) + Duration::microseconds(700);
        let period = RentalPeriod::new(now, at(12)).unwrap();
        assert!(period.ensure_not_in_past(now).is_ok());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(at(10));
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), at(12));
    }
}
