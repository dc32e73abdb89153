//! Repository implementations for persisted entities
//!
//! Repositories speak in database rows and `DatabaseError`; the adapters in
//! [`crate::adapters`] translate to domain types and port errors. Queries are
//! checked at runtime (`query_as::<_, Row>`) so the crate builds without a
//! live database.

pub mod boat;
pub mod booking;
pub mod user;

pub use boat::BoatRepository;
pub use booking::BookingRepository;
pub use user::UserRepository;
