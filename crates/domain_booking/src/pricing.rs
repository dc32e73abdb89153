//! Price calculation
//!
//! # Rules
//!
//! - Rentals of one day or more, and every rental of a daily-priced boat, are
//!   billed per started day: `daily_rate * ceil(days)`
//! - Shorter hourly rentals are billed per hour with a 4-hour minimum:
//!   `hourly_rate * max(hours, 4)`
//! - A 10% service fee is added on top of the base
//!
//! Amounts stay exact decimals here. Rounding to minor units happens once, when
//! the total is sent to the payment gateway.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::temporal::{MILLIS_PER_DAY, MILLIS_PER_HOUR};
use core_kernel::{Money, RentalPeriod};

use crate::boat::{Boat, PricingMode};

/// Service fee charged on top of the base rental price
pub const SERVICE_FEE_RATE: Decimal = dec!(0.10);

/// Minimum number of hours billed for hourly rentals
pub const MINIMUM_HOURS: Decimal = dec!(4);

/// Price of a rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: Money,
    pub service_fee: Money,
    pub total: Money,
}

impl PriceBreakdown {
    /// Builds a breakdown from a base price
    pub fn from_base(base: Money) -> Self {
        let service_fee = base.multiply(SERVICE_FEE_RATE);
        let total = Money::new(base.amount() + service_fee.amount(), base.currency());
        Self {
            base,
            service_fee,
            total,
        }
    }
}

/// Computes the price of renting `boat` for `period`
///
/// Pure: the same inputs always give the same breakdown.
pub fn compute_price(boat: &Boat, period: &RentalPeriod) -> PriceBreakdown {
    let millis = Decimal::from(period.duration_millis());
    let hours = millis / Decimal::from(MILLIS_PER_HOUR);
    let days = millis / Decimal::from(MILLIS_PER_DAY);

    let base = if days >= Decimal::ONE || boat.pricing_mode == PricingMode::Daily {
        boat.daily_rate.multiply(days.ceil())
    } else {
        boat.hourly_rate.multiply(hours.max(MINIMUM_HOURS))
    };

    PriceBreakdown::from_base(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_kernel::{Currency, UserId};

    fn boat() -> Boat {
        Boat::new(
            UserId::new(),
            "Test",
            8,
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(800), Currency::USD),
        )
        .unwrap()
    }

    fn period(length: Duration) -> RentalPeriod {
        let start = Utc.with_ymd_and_hms(2030, 7, 1, 10, 0, 0).unwrap();
        RentalPeriod::starting_at(start, length).unwrap()
    }

    #[test]
    fn test_two_hours_charges_four_hour_minimum() {
        let price = compute_price(&boat(), &period(Duration::hours(2)));
        assert_eq!(price.base.amount(), dec!(400));
        assert_eq!(price.service_fee.amount(), dec!(40));
        assert_eq!(price.total.amount(), dec!(440));
    }

    #[test]
    fn test_thirty_hours_rounds_up_to_two_days() {
        let price = compute_price(&boat(), &period(Duration::hours(30)));
        assert_eq!(price.base.amount(), dec!(1600));
        assert_eq!(price.service_fee.amount(), dec!(160));
        assert_eq!(price.total.amount(), dec!(1760));
    }

    #[test]
    fn test_exactly_four_hours() {
        let price = compute_price(&boat(), &period(Duration::hours(4)));
        assert_eq!(price.base.amount(), dec!(400));
    }

    #[test]
    fn test_exactly_one_day_is_daily() {
        let price = compute_price(&boat(), &period(Duration::hours(24)));
        assert_eq!(price.base.amount(), dec!(800));
    }

    #[test]
    fn test_fractional_hours_above_minimum() {
        let price = compute_price(&boat(), &period(Duration::minutes(330)));
        assert_eq!(price.base.amount(), dec!(550));
    }

    #[test]
    fn test_daily_mode_bills_short_rentals_as_a_day() {
        let boat = boat().with_pricing_mode(PricingMode::Daily);
        let price = compute_price(&boat, &period(Duration::hours(2)));
        assert_eq!(price.base.amount(), dec!(800));
        assert_eq!(price.total.amount(), dec!(880));
    }

    #[test]
    fn test_shortest_daily_rental_is_never_free() {
        let boat = boat().with_pricing_mode(PricingMode::Daily);
        let start = Utc.with_ymd_and_hms(2030, 7, 1, 10, 0, 0).unwrap();
        let shortest = RentalPeriod::new(start, start + Duration::microseconds(1_500)).unwrap();
        let price = compute_price(&boat, &shortest);
        assert_eq!(price.base.amount(), dec!(800));
        assert_eq!(price.total.amount(), dec!(880));
    }

    #[test]
    fn test_total_minor_units() {
        let price = compute_price(&boat(), &period(Duration::hours(2)));
        assert_eq!(price.total.to_minor_units().unwrap(), 44_000);
    }
}
