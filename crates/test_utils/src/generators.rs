//! Property-Based Test Generators
//!
//! Proptest strategies for boats and rental periods that respect the domain's
//! construction rules (positive capacity, shared rate currency, start < end).

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Currency, Money, RentalPeriod, UserId};
use domain_booking::{Boat, PricingMode};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Origin all generated periods are offset from
pub fn generation_origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()
}

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::CHF),
        Just(Currency::AUD),
        Just(Currency::CAD),
        Just(Currency::SGD),
    ]
}

/// Strategy for rates in minor units, zero allowed
pub fn rate_minor_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000i64
}

/// Strategy for rate pairs sharing one currency
pub fn rate_pair_strategy() -> impl Strategy<Value = (Money, Money)> {
    (rate_minor_strategy(), rate_minor_strategy(), currency_strategy()).prop_map(
        |(hourly, daily, currency)| {
            (
                Money::from_minor(hourly, currency),
                Money::from_minor(daily, currency),
            )
        },
    )
}

pub fn pricing_mode_strategy() -> impl Strategy<Value = PricingMode> {
    prop_oneof![Just(PricingMode::Hourly), Just(PricingMode::Daily)]
}

/// Strategy for valid boats
pub fn boat_strategy() -> impl Strategy<Value = Boat> {
    (1u32..30, rate_pair_strategy(), pricing_mode_strategy()).prop_map(
        |(capacity, (hourly, daily), mode)| {
            Boat::new(UserId::new(), "Generated", capacity, hourly, daily)
                .expect("generated boat must be valid")
                .with_pricing_mode(mode)
        },
    )
}

/// Strategy for rental lengths in minutes, from one minute to ten days
pub fn rental_minutes_strategy() -> impl Strategy<Value = i64> {
    1i64..(10 * 24 * 60)
}

/// Strategy for periods within a year of [`generation_origin`]
pub fn period_strategy() -> impl Strategy<Value = RentalPeriod> {
    (0i64..(365 * 24 * 60), rental_minutes_strategy()).prop_map(|(offset, length)| {
        RentalPeriod::starting_at(
            generation_origin() + Duration::minutes(offset),
            Duration::minutes(length),
        )
        .expect("generated period must be valid")
    })
}

/// Strategy for service fee inputs: non-negative amounts with up to 4 decimals
pub fn base_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64, 0u32..=4u32).prop_map(|(m, s)| Decimal::new(m, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_generated_boats_are_valid(boat in boat_strategy()) {
            prop_assert!(boat.validate().is_ok());
            prop_assert!(boat.capacity >= 1);
        }

        #[test]
        fn test_generated_periods_are_ordered(period in period_strategy()) {
            prop_assert!(period.start() < period.end());
        }
    }
}
