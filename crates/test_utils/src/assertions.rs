//! Custom Test Assertions
//!
//! Assertion helpers for booking-domain types with failure messages that name
//! the offending values.

use core_kernel::Money;
use domain_booking::{Booking, BookingError, BookingStatus, PaymentStatus, PriceBreakdown};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a price's parts add up and share one currency
pub fn assert_price_consistent(price: &PriceBreakdown) {
    assert_eq!(price.base.currency(), price.total.currency(), "base/total currency mismatch");
    assert_eq!(
        price.service_fee.currency(),
        price.total.currency(),
        "fee/total currency mismatch"
    );
    assert_eq!(
        price.base.amount() + price.service_fee.amount(),
        price.total.amount(),
        "base ({}) + fee ({}) != total ({})",
        price.base.amount(),
        price.service_fee.amount(),
        price.total.amount()
    );
}

/// Asserts a booking's status pair
pub fn assert_booking_state(booking: &Booking, status: BookingStatus, payment: PaymentStatus) {
    assert_eq!(
        (booking.status, booking.payment_status),
        (status, payment),
        "booking {} is {}/{}, expected {}/{}",
        booking.id,
        booking.status,
        booking.payment_status,
        status,
        payment
    );
}

/// Asserts that no two non-cancelled bookings of the same boat overlap
pub fn assert_no_active_overlap(bookings: &[Booking]) {
    let active: Vec<&Booking> = bookings.iter().filter(|b| b.holds_period()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in active.iter().skip(i + 1) {
            assert!(
                a.boat_id != b.boat_id || !a.period.overlaps(&b.period),
                "bookings {} and {} overlap on boat {}",
                a.id,
                b.id,
                a.boat_id
            );
        }
    }
}

/// Asserts that a result failed with the given `BookingError::kind`
pub fn assert_error_kind<T: std::fmt::Debug>(result: &Result<T, BookingError>, kind: &str) {
    match result {
        Err(e) => assert_eq!(e.kind(), kind, "unexpected error: {e}"),
        Ok(v) => panic!("expected {kind} error, got Ok({v:?})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{TestBoatBuilder, TestBookingBuilder};
    use crate::fixtures::TemporalFixtures;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_approx_within_tolerance() {
        assert_money_approx_eq(
            &Money::new(dec!(10.001), Currency::USD),
            &Money::new(dec!(10.00), Currency::USD),
            dec!(0.01),
        );
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_money_approx_currency_mismatch() {
        assert_money_approx_eq(
            &Money::new(dec!(10), Currency::USD),
            &Money::new(dec!(10), Currency::EUR),
            dec!(1),
        );
    }

    #[test]
    fn test_cancelled_bookings_do_not_count_as_overlap() {
        let boat = TestBoatBuilder::new().build();
        let active = TestBookingBuilder::for_boat(&boat).build();
        let cancelled = TestBookingBuilder::for_boat(&boat)
            .cancelled_by(active.renter_id)
            .build();
        assert_no_active_overlap(&[active, cancelled]);
    }

    #[test]
    #[should_panic(expected = "overlap")]
    fn test_overlap_detected() {
        let boat = TestBoatBuilder::new().build();
        let a = TestBookingBuilder::for_boat(&boat).build();
        let b = TestBookingBuilder::for_boat(&boat)
            .with_period(TemporalFixtures::hours(6))
            .build();
        assert_no_active_overlap(&[a, b]);
    }

    #[test]
    fn test_error_kind() {
        let result: Result<(), BookingError> = Err(BookingError::conflict("taken"));
        assert_error_kind(&result, "conflict");
    }
}
