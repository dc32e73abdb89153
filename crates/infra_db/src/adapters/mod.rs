//! Port adapters
//!
//! Each adapter implements domain port traits on top of the repositories,
//! translating between rows and domain models and between `DatabaseError`
//! and `PortError`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBookingAdapter;
//! use domain_booking::BookingPort;
//!
//! let adapter = PostgresBookingAdapter::new(pool);
//! let booking = adapter.get_booking(booking_id, None).await?;
//! ```

pub mod booking;

pub use booking::PostgresBookingAdapter;
