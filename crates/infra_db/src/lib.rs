//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the booking core using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL and row types, one repository per table
//! - [`adapters`]: implementations of the domain's `BoatPort` and
//!   `BookingPort` on top of the repositories
//! - [`migrate`]: embedded schema migrations
//! - [`bootstrap`]: idempotent creation of the system and admin users
//!
//! # Double booking
//!
//! The schema carries an exclusion constraint over
//! `(boat_id, tstzrange(start_at, end_at, '[)'))` for non-cancelled bookings,
//! so concurrent creates for overlapping periods cannot both commit.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::PostgresBookingAdapter;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/boat_charter")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBookingAdapter::new(pool);
//! ```

pub mod adapters;
pub mod bootstrap;
pub mod error;
pub mod migrate;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresBookingAdapter;
pub use bootstrap::ensure_system_actors;
pub use error::{db_to_port_error, DatabaseError};
pub use migrate::{run_migrations, MIGRATOR};
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
