//! Pre-built Test Fixtures
//!
//! Ready-to-use, predictable values for boats, periods, and money. The
//! reference boat charges 100 USD/hour and 800 USD/day, so the worked pricing
//! examples (4h -> 440.00, 2 days -> 1760.00) hold against it.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Currency, FixedClock, Money, RentalPeriod, UserId};
use domain_booking::{Boat, SystemActors};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Reference hourly rate
    pub fn usd_hourly() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Reference daily rate
    pub fn usd_daily() -> Money {
        Money::new(dec!(800.00), Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The instant test clocks are frozen at (July 1, 2030, midnight UTC)
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 7, 1, 0, 0, 0).unwrap()
    }

    /// A clock frozen at [`TemporalFixtures::now`]
    pub fn clock() -> FixedClock {
        FixedClock::new(Self::now())
    }

    /// 10:00 on July 15, 2030; two weeks after `now`
    pub fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 7, 15, 10, 0, 0).unwrap()
    }

    /// `hours` starting at [`TemporalFixtures::morning`]
    pub fn hours(hours: i64) -> RentalPeriod {
        RentalPeriod::starting_at(Self::morning(), Duration::hours(hours)).unwrap()
    }

    /// `days` whole days starting at midnight on July 15, 2030
    pub fn days(days: i64) -> RentalPeriod {
        let start = Utc.with_ymd_and_hms(2030, 7, 15, 0, 0, 0).unwrap();
        RentalPeriod::starting_at(start, Duration::days(days)).unwrap()
    }
}

/// Fixture for well-known actors
pub struct ActorFixtures;

impl ActorFixtures {
    /// Deterministic system and admin ids
    pub fn system_actors() -> SystemActors {
        SystemActors::new(
            UserId::from_uuid(uuid::Uuid::from_u128(0x5157_0000_0000_0000_0000_0000_0000_0001)),
            UserId::from_uuid(uuid::Uuid::from_u128(0xad31_0000_0000_0000_0000_0000_0000_0001)),
        )
    }
}

/// Fixture for boats
pub struct BoatFixtures;

impl BoatFixtures {
    /// The reference hourly boat: capacity 6, 100/800 USD
    pub fn reference(host: UserId) -> Boat {
        Boat::new(
            host,
            "Sea Breeze",
            6,
            MoneyFixtures::usd_hourly(),
            MoneyFixtures::usd_daily(),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_booking::compute_price;

    #[test]
    fn test_reference_boat_matches_worked_examples() {
        let boat = BoatFixtures::reference(UserId::new());
        assert_eq!(compute_price(&boat, &TemporalFixtures::hours(4)).total.amount(), dec!(440));
        assert_eq!(compute_price(&boat, &TemporalFixtures::days(2)).total.amount(), dec!(1760));
    }

    #[test]
    fn test_periods_are_in_the_future() {
        assert!(TemporalFixtures::hours(1).start() > TemporalFixtures::now());
        assert!(TemporalFixtures::days(1).start() > TemporalFixtures::now());
    }

    #[test]
    fn test_system_actors_are_distinct() {
        let actors = ActorFixtures::system_actors();
        assert_ne!(actors.system, actors.admin);
    }
}
