//! Test Data Builders
//!
//! Builder patterns for boats and bookings. Tests set only the fields they
//! care about; everything else defaults to the reference fixtures.

use chrono::{DateTime, Utc};
use core_kernel::{BookingId, Money, RentalPeriod, UserId};
use domain_booking::{
    compute_price, Boat, Booking, BookingStatus, PaymentStatus, PricingMode, StatusChange,
};

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for constructing test boats
pub struct TestBoatBuilder {
    host_id: UserId,
    name: String,
    capacity: u32,
    hourly_rate: Money,
    daily_rate: Money,
    pricing_mode: PricingMode,
    is_available: bool,
}

impl Default for TestBoatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBoatBuilder {
    /// Creates a builder for the reference boat with a fresh host
    pub fn new() -> Self {
        Self {
            host_id: UserId::new(),
            name: "Sea Breeze".to_string(),
            capacity: 6,
            hourly_rate: MoneyFixtures::usd_hourly(),
            daily_rate: MoneyFixtures::usd_daily(),
            pricing_mode: PricingMode::Hourly,
            is_available: true,
        }
    }

    pub fn with_host(mut self, host_id: UserId) -> Self {
        self.host_id = host_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets both rates
    pub fn with_rates(mut self, hourly: Money, daily: Money) -> Self {
        self.hourly_rate = hourly;
        self.daily_rate = daily;
        self
    }

    /// Bills every rental by the started day
    pub fn daily(mut self) -> Self {
        self.pricing_mode = PricingMode::Daily;
        self
    }

    /// Marks the boat as not accepting bookings
    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    /// Builds the boat
    ///
    /// # Panics
    ///
    /// Panics if the configured values are not a valid boat.
    pub fn build(self) -> Boat {
        let mut boat = Boat::new(
            self.host_id,
            self.name,
            self.capacity,
            self.hourly_rate,
            self.daily_rate,
        )
        .expect("test boat must be valid")
        .with_pricing_mode(self.pricing_mode);
        boat.is_available = self.is_available;
        boat
    }
}

/// Builder for bookings stored directly, bypassing the service
///
/// Useful to seed states the service only reaches through payment events,
/// such as `pending`/`paid`.
pub struct TestBookingBuilder {
    boat: Boat,
    renter_id: UserId,
    period: RentalPeriod,
    guest_count: u32,
    special_requests: Option<String>,
    payment_intent_id: Option<String>,
    status: BookingStatus,
    payment_status: PaymentStatus,
    cancelled_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl TestBookingBuilder {
    /// A `pending`/`pending` 4-hour booking of `boat`
    pub fn for_boat(boat: &Boat) -> Self {
        Self {
            boat: boat.clone(),
            renter_id: UserId::new(),
            period: TemporalFixtures::hours(4),
            guest_count: 2,
            special_requests: None,
            payment_intent_id: None,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancelled_by: None,
            created_at: TemporalFixtures::now(),
        }
    }

    pub fn with_renter(mut self, renter_id: UserId) -> Self {
        self.renter_id = renter_id;
        self
    }

    pub fn with_period(mut self, period: RentalPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_guests(mut self, guest_count: u32) -> Self {
        self.guest_count = guest_count;
        self
    }

    pub fn with_special_requests(mut self, requests: impl Into<String>) -> Self {
        self.special_requests = Some(requests.into());
        self
    }

    pub fn with_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(intent_id.into());
        self
    }

    /// Sets both status fields
    pub fn with_status(mut self, status: BookingStatus, payment_status: PaymentStatus) -> Self {
        self.status = status;
        self.payment_status = payment_status;
        self
    }

    /// Cancelled by `actor`, keeping the payment status
    pub fn cancelled_by(mut self, actor: UserId) -> Self {
        self.status = BookingStatus::Cancelled;
        self.cancelled_by = Some(actor);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Builds the booking, priced from the boat and period
    pub fn build(self) -> Booking {
        let price = compute_price(&self.boat, &self.period);
        let mut booking = Booking::pending(
            BookingId::new_v7(),
            self.renter_id,
            &self.boat,
            self.period,
            self.guest_count,
            self.special_requests,
            price,
            self.payment_intent_id,
            self.created_at,
        );
        let change = match self.cancelled_by {
            Some(actor) => StatusChange::cancel(self.payment_status, actor, self.created_at),
            None => StatusChange::to(self.status, self.payment_status, self.created_at),
        };
        booking.apply(&change);
        booking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_boat_builder_defaults() {
        let boat = TestBoatBuilder::new().build();
        assert_eq!(boat.capacity, 6);
        assert!(boat.is_available);
        assert_eq!(boat.pricing_mode, PricingMode::Hourly);
    }

    #[test]
    fn test_boat_builder_overrides() {
        let boat = TestBoatBuilder::new().with_capacity(2).daily().unavailable().build();
        assert_eq!(boat.capacity, 2);
        assert!(!boat.is_available);
        assert_eq!(boat.pricing_mode, PricingMode::Daily);
    }

    #[test]
    fn test_booking_builder_prices_and_sets_status() {
        let boat = TestBoatBuilder::new().build();
        let booking = TestBookingBuilder::for_boat(&boat)
            .with_status(BookingStatus::Pending, PaymentStatus::Paid)
            .with_intent("pi_seeded")
            .build();

        assert_eq!(booking.price.total.amount(), dec!(440));
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(booking.host_id, boat.host_id);
        assert_eq!(booking.payment_intent_id.as_deref(), Some("pi_seeded"));
    }

    #[test]
    fn test_cancelled_booking_records_actor() {
        let boat = TestBoatBuilder::new().build();
        let actor = UserId::new();
        let booking = TestBookingBuilder::for_boat(&boat).cancelled_by(actor).build();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.cancelled_by, Some(actor));
        assert!(booking.cancelled_at.is_some());
    }
}
