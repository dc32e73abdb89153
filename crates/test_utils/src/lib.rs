//! Test Utilities Crate
//!
//! Shared test infrastructure for the boat charter workspace.
//!
//! # Modules
//!
//! - `fixtures`: Predictable money, time, actor, and boat values
//! - `builders`: Builders for boats and directly-seeded bookings
//! - `database`: PostgreSQL testcontainers with migrations and seed helpers
//! - `assertions`: Assertion helpers for prices, states, and overlaps
//! - `generators`: Proptest strategies for boats and periods
//! - `harness`: A booking service wired to in-memory adapters

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;
pub mod harness;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;
