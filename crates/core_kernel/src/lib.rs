//! Core Kernel - Foundational types for the boat charter backend
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money types with precise decimal arithmetic and minor-unit conversion
//! - Half-open rental periods and an injectable clock
//! - Strongly-typed identifiers
//! - Port error and adapter marker traits for the ports-and-adapters layout

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{RentalPeriod, TemporalError, Clock, SystemClock, FixedClock};
pub use identifiers::{BookingId, BoatId, UserId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata,
};
