//! Availability checks
//!
//! A read-only pre-check run before a payment intent is created. It is not the
//! last word: the store rejects overlapping inserts on its own, which closes
//! the window between this check and the insert.

use std::sync::Arc;

use tracing::instrument;

use core_kernel::{BoatId, RentalPeriod};

use crate::booking::Booking;
use crate::error::BookingError;
use crate::ports::BookingPort;

/// Answers whether a boat is free for a period
#[derive(Clone)]
pub struct AvailabilityChecker {
    bookings: Arc<dyn BookingPort>,
}

impl AvailabilityChecker {
    pub fn new(bookings: Arc<dyn BookingPort>) -> Self {
        Self { bookings }
    }

    /// True when a non-cancelled booking of `boat_id` overlaps `period`
    #[instrument(skip(self), fields(boat_id = %boat_id))]
    pub async fn has_overlap(
        &self,
        boat_id: BoatId,
        period: &RentalPeriod,
    ) -> Result<bool, BookingError> {
        Ok(!self.conflicts(boat_id, period).await?.is_empty())
    }

    /// The bookings that block `period`
    pub async fn conflicts(
        &self,
        boat_id: BoatId,
        period: &RentalPeriod,
    ) -> Result<Vec<Booking>, BookingError> {
        self.bookings
            .find_overlapping(boat_id, period, None)
            .await
            .map_err(BookingError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boat::Boat;
    use crate::booking::{BookingStatus, PaymentStatus, StatusChange};
    use crate::ports::mock::InMemoryBookingStore;
    use crate::pricing::compute_price;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use core_kernel::{BookingId, Currency, Money, UserId};
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 7, 1, hour, 0, 0).unwrap()
    }

    fn boat() -> Boat {
        Boat::new(
            UserId::new(),
            "Test",
            6,
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(800), Currency::USD),
        )
        .unwrap()
    }

    async fn store_with(boat: &Boat, start: u32, end: u32) -> (Arc<InMemoryBookingStore>, Booking) {
        let store = Arc::new(InMemoryBookingStore::new());
        let period = RentalPeriod::new(at(start), at(end)).unwrap();
        let booking = Booking::pending(
            BookingId::new(),
            UserId::new(),
            boat,
            period,
            1,
            None,
            compute_price(boat, &period),
            None,
            at(0),
        );
        store.insert_booking(&booking, None).await.unwrap();
        (store, booking)
    }

    #[tokio::test]
    async fn test_overlap_and_back_to_back() {
        let boat = boat();
        let (store, _) = store_with(&boat, 10, 12).await;
        let checker = AvailabilityChecker::new(store);

        let overlapping = RentalPeriod::new(at(11), at(13)).unwrap();
        let adjacent = RentalPeriod::new(at(12), at(14)).unwrap();
        let before = RentalPeriod::new(at(8), at(10)).unwrap();

        assert!(checker.has_overlap(boat.id, &overlapping).await.unwrap());
        assert!(!checker.has_overlap(boat.id, &adjacent).await.unwrap());
        assert!(!checker.has_overlap(boat.id, &before).await.unwrap());
        assert!(!checker.has_overlap(BoatId::new(), &overlapping).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_bookings_do_not_block() {
        let boat = boat();
        let (store, booking) = store_with(&boat, 10, 12).await;
        store
            .update_status(
                booking.id,
                booking.guard(),
                StatusChange::cancel(PaymentStatus::Pending, booking.renter_id, at(1)),
                None,
            )
            .await
            .unwrap();
        let checker = AvailabilityChecker::new(store);

        let same = RentalPeriod::new(at(10), at(12)).unwrap();
        assert!(!checker.has_overlap(boat.id, &same).await.unwrap());
        assert_eq!(
            checker.conflicts(boat.id, &same).await.unwrap().len(),
            0,
            "a {} booking should not conflict",
            BookingStatus::Cancelled
        );
    }
}
