//! Boat repository
//!
//! Boats are read by the booking core; the only write besides seeding is the
//! denormalized `booking_count`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const BOAT_COLUMNS: &str = r#"
    boat_id, host_id, name, capacity, hourly_rate, daily_rate, currency,
    pricing_mode, is_available, booking_count, created_at, updated_at
"#;

/// Database enum for pricing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "pricing_mode", rename_all = "snake_case")]
pub enum PricingMode {
    Hourly,
    Daily,
}

/// Database row representation of a boat
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BoatRow {
    pub boat_id: Uuid,
    pub host_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub hourly_rate: Decimal,
    pub daily_rate: Decimal,
    pub currency: String,
    pub pricing_mode: PricingMode,
    pub is_available: bool,
    pub booking_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a boat
#[derive(Debug, Clone)]
pub struct NewBoat {
    pub boat_id: Uuid,
    pub host_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub hourly_rate: Decimal,
    pub daily_rate: Decimal,
    pub currency: String,
    pub pricing_mode: PricingMode,
    pub is_available: bool,
}

/// Repository for boat rows
#[derive(Debug, Clone)]
pub struct BoatRepository {
    pool: PgPool,
}

impl BoatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a boat by identifier
    pub async fn get_by_id(&self, boat_id: Uuid) -> Result<BoatRow, DatabaseError> {
        let sql = format!("SELECT {BOAT_COLUMNS} FROM boats WHERE boat_id = $1");
        sqlx::query_as::<_, BoatRow>(&sql)
            .bind(boat_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Boat", boat_id))
    }

    /// Inserts a boat
    pub async fn insert(&self, boat: &NewBoat) -> Result<BoatRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO boats (
                boat_id, host_id, name, capacity, hourly_rate, daily_rate,
                currency, pricing_mode, is_available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BOAT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BoatRow>(&sql)
            .bind(boat.boat_id)
            .bind(boat.host_id)
            .bind(&boat.name)
            .bind(boat.capacity)
            .bind(boat.hourly_rate)
            .bind(boat.daily_rate)
            .bind(&boat.currency)
            .bind(boat.pricing_mode)
            .bind(boat.is_available)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    /// Atomically adds one to the booking counter
    pub async fn increment_booking_count(&self, boat_id: Uuid) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE boats
            SET booking_count = booking_count + 1, updated_at = now()
            WHERE boat_id = $1
            RETURNING booking_count
            "#,
        )
        .bind(boat_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Boat", boat_id))
    }
}
