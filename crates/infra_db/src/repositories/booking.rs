//! Booking repository implementation
//!
//! Two storage-level rules back the booking lifecycle:
//!
//! - The `bookings_no_overlap` exclusion constraint rejects any insert or
//!   un-cancel that would make two active bookings of a boat overlap. The
//!   violation surfaces as [`DatabaseError::Overlap`].
//! - Status writes are conditional on the `(status, payment_status)` pair the
//!   caller last observed. A lost race surfaces as
//!   [`DatabaseError::StaleUpdate`] so the caller can re-read and decide again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DatabaseError;

const BOOKING_COLUMNS: &str = r#"
    booking_id, renter_id, boat_id, host_id, start_at, end_at, guest_count,
    special_requests, base_amount, service_fee, total_amount, currency,
    payment_intent_id, status, payment_status, cancelled_by, cancelled_at,
    created_at, updated_at
"#;

/// Database enum for booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// Database enum for payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Database row representation of a booking
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub booking_id: Uuid,
    pub renter_id: Uuid,
    pub boat_id: Uuid,
    pub host_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub guest_count: i32,
    pub special_requests: Option<String>,
    pub base_amount: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New status values for a conditional update
///
/// `None` cancellation fields leave the stored values untouched.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Whose bookings a search selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    Renter(Uuid),
    Host(Uuid),
    Participant(Uuid),
    All,
}

/// Search criteria for booking listings
#[derive(Debug, Clone)]
pub struct BookingFilter {
    pub scope: FilterScope,
    pub status: Option<BookingStatus>,
    pub boat_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for booking rows
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Creates a new BookingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a booking by identifier
    pub async fn get_by_id(&self, booking_id: Uuid) -> Result<BookingRow, DatabaseError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Booking", booking_id))
    }

    /// Retrieves the booking referencing a payment intent, if any
    pub async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<BookingRow>, DatabaseError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_intent_id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Active bookings of a boat intersecting `[start, end)`
    pub async fn find_overlapping(
        &self,
        boat_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BookingRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE boat_id = $1
              AND status <> 'cancelled'
              AND start_at < $3
              AND end_at > $2
            ORDER BY start_at
            "#
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(boat_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Lists bookings matching a filter, newest first
    pub async fn search(&self, filter: &BookingFilter) -> Result<Vec<BookingRow>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));

        match filter.scope {
            FilterScope::Renter(user) => {
                builder.push(" AND renter_id = ").push_bind(user);
            }
            FilterScope::Host(user) => {
                builder.push(" AND host_id = ").push_bind(user);
            }
            FilterScope::Participant(user) => {
                builder
                    .push(" AND (renter_id = ")
                    .push_bind(user)
                    .push(" OR host_id = ")
                    .push_bind(user)
                    .push(")");
            }
            FilterScope::All => {}
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(boat_id) = filter.boat_id {
            builder.push(" AND boat_id = ").push_bind(boat_id);
        }

        builder
            .push(" ORDER BY created_at DESC, booking_id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = builder
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts a booking
    ///
    /// # Errors
    ///
    /// `DatabaseError::Overlap` when an active booking of the same boat
    /// already holds part of the period.
    pub async fn insert(&self, row: &BookingRow) -> Result<BookingRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO bookings (
                booking_id, renter_id, boat_id, host_id, start_at, end_at,
                guest_count, special_requests, base_amount, service_fee,
                total_amount, currency, payment_intent_id, status,
                payment_status, cancelled_by, cancelled_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let stored = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(row.booking_id)
            .bind(row.renter_id)
            .bind(row.boat_id)
            .bind(row.host_id)
            .bind(row.start_at)
            .bind(row.end_at)
            .bind(row.guest_count)
            .bind(&row.special_requests)
            .bind(row.base_amount)
            .bind(row.service_fee)
            .bind(row.total_amount)
            .bind(&row.currency)
            .bind(&row.payment_intent_id)
            .bind(row.status)
            .bind(row.payment_status)
            .bind(row.cancelled_by)
            .bind(row.cancelled_at)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    /// Writes new status fields if the row still has the expected pair
    ///
    /// # Errors
    ///
    /// - `DatabaseError::NotFound` if the booking does not exist
    /// - `DatabaseError::StaleUpdate` if it exists in another state
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        expected_status: BookingStatus,
        expected_payment: PaymentStatus,
        update: &StatusUpdate,
    ) -> Result<BookingRow, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $1,
                payment_status = $2,
                cancelled_by = COALESCE($3, cancelled_by),
                cancelled_at = COALESCE($4, cancelled_at),
                updated_at = $5
            WHERE booking_id = $6
              AND status = $7
              AND payment_status = $8
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(update.status)
            .bind(update.payment_status)
            .bind(update.cancelled_by)
            .bind(update.cancelled_at)
            .bind(update.updated_at)
            .bind(booking_id)
            .bind(expected_status)
            .bind(expected_payment)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(row) => Ok(row),
            None if self.exists(booking_id).await? => Err(DatabaseError::StaleUpdate(format!(
                "Booking {booking_id} is no longer {expected_status:?}/{expected_payment:?}"
            ))),
            None => Err(DatabaseError::not_found("Booking", booking_id)),
        }
    }

    async fn exists(&self, booking_id: Uuid) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE booking_id = $1)",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
