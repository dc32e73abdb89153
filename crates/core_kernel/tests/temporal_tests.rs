//! Tests for rental periods and clocks

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Clock, FixedClock, RentalPeriod, TemporalError};
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

mod rental_period {
    use super::*;

    #[test]
    fn test_new_fails_when_start_equals_end() {
        let result = RentalPeriod::new(base(), base());
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_duration_millis() {
        let period = RentalPeriod::starting_at(base(), Duration::hours(30)).unwrap();
        assert_eq!(period.duration_millis(), 30 * 3_600_000);
    }

    #[test]
    fn test_starts_in_past_error() {
        let period = RentalPeriod::starting_at(base(), Duration::hours(2)).unwrap();
        let result = period.ensure_not_in_past(base() + Duration::milliseconds(1));
        assert!(matches!(result, Err(TemporalError::StartsInPast { .. })));
    }

    #[test]
    fn test_serde_round_trip_keeps_bounds() {
        let period = RentalPeriod::starting_at(base(), Duration::hours(2)).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        let parsed: RentalPeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, period);
    }
}

mod clock {
    use super::*;

    #[test]
    fn test_fixed_clock_set() {
        let clock = FixedClock::new(base());
        let later = base() + Duration::days(3);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}

fn period_strategy() -> impl Strategy<Value = RentalPeriod> {
    (0i64..10_000, 1i64..500).prop_map(|(start_min, len_min)| {
        let start = base() + Duration::minutes(start_min);
        RentalPeriod::starting_at(start, Duration::minutes(len_min)).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_overlap_is_symmetric(a in period_strategy(), b in period_strategy()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn prop_period_overlaps_itself(a in period_strategy()) {
        prop_assert!(a.overlaps(&a));
    }

    #[test]
    fn prop_adjacent_periods_never_overlap(a in period_strategy(), len in 1i64..500) {
        let next = RentalPeriod::starting_at(a.end(), Duration::minutes(len)).unwrap();
        prop_assert!(!a.overlaps(&next));
    }

    #[test]
    fn prop_overlap_matches_shared_instant(a in period_strategy(), b in period_strategy()) {
        // Half-open periods overlap iff one contains the start of the other
        let shares = a.contains(b.start()) || b.contains(a.start());
        prop_assert_eq!(a.overlaps(&b), shares);
    }
}
