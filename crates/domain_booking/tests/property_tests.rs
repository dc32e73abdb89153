//! Property tests for pricing and the no-double-booking invariant

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, FixedClock, Money, UserId};
use domain_booking::ports::mock::InMemoryBookingStore;
use domain_booking::pricing::PriceBreakdown;
use domain_booking::{
    compute_price, Boat, BookingService, BookingStatus, CreateBooking, PricingMode, SystemActors,
};
use domain_payment::ports::mock::MockPaymentGateway;
use test_utils::{
    assert_money_approx_eq, assert_no_active_overlap, assert_price_consistent,
    base_amount_strategy, boat_strategy, currency_strategy, generation_origin, period_strategy,
};

fn origin() -> DateTime<Utc> {
    generation_origin()
}

proptest! {
    #[test]
    fn prop_price_is_deterministic(boat in boat_strategy(), period in period_strategy()) {
        prop_assert_eq!(compute_price(&boat, &period), compute_price(&boat, &period));
    }

    #[test]
    fn prop_total_is_base_plus_fee(boat in boat_strategy(), period in period_strategy()) {
        let price = compute_price(&boat, &period);
        assert_price_consistent(&price);
        prop_assert_eq!(price.base.currency(), boat.hourly_rate.currency());
    }

    #[test]
    fn prop_fee_is_ten_percent_of_any_base(amount in base_amount_strategy(), currency in currency_strategy()) {
        let price = PriceBreakdown::from_base(Money::new(amount, currency));
        assert_money_approx_eq(
            &price.service_fee,
            &Money::new(amount * dec!(0.10), currency),
            dec!(0.0001),
        );
        prop_assert_eq!(price.total.amount(), amount + price.service_fee.amount());
    }

    #[test]
    fn prop_hourly_rentals_charge_at_least_minimum(boat in boat_strategy(), period in period_strategy()) {
        let price = compute_price(&boat, &period);
        let minimum = boat.hourly_rate.amount() * dec!(4);
        let floor = minimum.min(boat.daily_rate.amount());
        prop_assert!(price.base.amount() >= floor);
    }

    #[test]
    fn prop_daily_pricing_is_whole_days(boat in boat_strategy(), period in period_strategy()) {
        let price = compute_price(&boat, &period);
        let days = Decimal::from(period.duration_millis()) / Decimal::from(86_400_000i64);
        if days >= Decimal::ONE || boat.pricing_mode == PricingMode::Daily {
            prop_assert_eq!(price.base.amount(), boat.daily_rate.amount() * days.ceil());
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create { start_hour: u32, hours: u32 },
    Cancel { index: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..48, 1u32..10).prop_map(|(start_hour, hours)| Op::Create { start_hour, hours }),
        1 => (0usize..32).prop_map(|index| Op::Cancel { index }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_no_overlapping_active_bookings(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let host = UserId::new();
            let renter = UserId::new();
            let boat = Boat::new(
                host,
                "Invariant",
                8,
                Money::new(dec!(100), Currency::USD),
                Money::new(dec!(800), Currency::USD),
            )
            .unwrap();
            let store = Arc::new(InMemoryBookingStore::with_boats(vec![boat.clone()]).await);
            let service = BookingService::new(
                store.clone(),
                store.clone(),
                Arc::new(MockPaymentGateway::new()),
                Arc::new(FixedClock::new(origin())),
                SystemActors::new(UserId::new(), UserId::new()),
            );

            let mut created = Vec::new();
            for op in ops {
                match op {
                    Op::Create { start_hour, hours } => {
                        let start = origin() + Duration::hours(i64::from(start_hour));
                        let request = CreateBooking {
                            boat_id: boat.id,
                            start,
                            end: start + Duration::hours(i64::from(hours)),
                            guest_count: 1,
                            special_requests: None,
                        };
                        if let Ok(c) = service.create(renter, request).await {
                            created.push(c.booking.id);
                        }
                    }
                    Op::Cancel { index } => {
                        if let Some(id) = created.get(index) {
                            let _ = service.transition(*id, renter, BookingStatus::Cancelled).await;
                        }
                    }
                }
            }

            assert_no_active_overlap(&store.all_bookings().await);
        });
    }
}
