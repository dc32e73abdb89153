//! Booking Domain - Boats, Pricing, Availability and the Booking Lifecycle
//!
//! This crate owns every write to a booking:
//!
//! - **Pricing**: hourly with a 4-hour minimum, daily per started day, plus a
//!   10% service fee
//! - **Availability**: half-open overlap checks against non-cancelled bookings
//! - **Lifecycle**: create, confirm, cancel (with refund), manual payment
//!   reconciliation, and webhook-driven payment outcomes
//!
//! Persistence and payments are reached through ports ([`ports::BoatPort`],
//! [`ports::BookingPort`], `domain_payment::PaymentGateway`), so the service
//! runs unchanged against PostgreSQL or the in-memory store.

pub mod actor;
pub mod availability;
pub mod boat;
pub mod booking;
pub mod error;
pub mod ports;
pub mod pricing;
pub mod services;

pub use actor::{Actor, SystemActors};
pub use availability::AvailabilityChecker;
pub use boat::{Boat, PricingMode};
pub use booking::{Booking, BookingStatus, PaymentStatus, StatusChange, StatusGuard};
pub use error::BookingError;
pub use ports::{BoatPort, BookingPort, BookingQuery, BookingScope};
pub use pricing::{compute_price, PriceBreakdown};
pub use services::{
    BookingService, CreateBooking, CreatedBooking, ListBookings, ListScope, ReconcileOutcome,
    WebhookOutcome, MAX_SPECIAL_REQUESTS_CHARS,
};
