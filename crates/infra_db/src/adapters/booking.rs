//! PostgreSQL Booking Adapter
//!
//! Implements the booking domain's `BoatPort` and `BookingPort` on top of the
//! boat and booking repositories.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBookingAdapter;
//! use domain_booking::{BoatPort, BookingPort};
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(PostgresBookingAdapter::new(pool));
//! let boats: Arc<dyn BoatPort> = adapter.clone();
//! let bookings: Arc<dyn BookingPort> = adapter;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BoatId, BookingId, Currency, DomainPort, HealthCheckResult, HealthCheckable,
    Money, OperationMetadata, PortError, RentalPeriod, UserId,
};
use domain_booking::{
    Boat, BoatPort, Booking, BookingPort, BookingQuery, BookingScope, BookingStatus,
    PaymentStatus, PriceBreakdown, PricingMode, StatusChange, StatusGuard,
};

use crate::error::{db_to_port_error, DatabaseError};
use crate::repositories::boat::{BoatRepository, BoatRow, PricingMode as DbPricingMode};
use crate::repositories::booking::{
    BookingFilter, BookingRepository, BookingRow, BookingStatus as DbBookingStatus, FilterScope,
    PaymentStatus as DbPaymentStatus, StatusUpdate,
};

const ADAPTER_ID: &str = "postgres-booking-adapter";

/// PostgreSQL-backed implementation of the boat and booking ports
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::Overlap` and `StaleUpdate` -> `PortError::Conflict`
/// - Connection and pool errors -> `PortError::Connection` / `ServiceUnavailable`
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresBookingAdapter {
    boats: BoatRepository,
    bookings: BookingRepository,
    pool: PgPool,
}

impl PostgresBookingAdapter {
    /// Creates a new adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            boats: BoatRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Boat repository, for seeding and tooling outside the ports
    pub fn boat_repository(&self) -> &BoatRepository {
        &self.boats
    }

    /// Booking repository, for seeding and tooling outside the ports
    pub fn booking_repository(&self) -> &BookingRepository {
        &self.bookings
    }
}

impl DomainPort for PostgresBookingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBookingAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {e}")),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl BoatPort for PostgresBookingAdapter {
    #[instrument(skip(self, _metadata), fields(boat_id = %id))]
    async fn get_boat(
        &self,
        id: BoatId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Boat, PortError> {
        let row = self.boats.get_by_id(id.into()).await.map_err(db_to_port_error)?;
        boat_from_row(row).map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata), fields(boat_id = %id))]
    async fn increment_booking_count(
        &self,
        id: BoatId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let count = self
            .boats
            .increment_booking_count(id.into())
            .await
            .map_err(db_to_port_error)?;
        debug!(booking_count = count, "Boat booking count incremented");
        Ok(())
    }
}

#[async_trait]
impl BookingPort for PostgresBookingAdapter {
    #[instrument(skip(self, _metadata), fields(booking_id = %id))]
    async fn get_booking(
        &self,
        id: BookingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError> {
        let row = self.bookings.get_by_id(id.into()).await.map_err(db_to_port_error)?;
        booking_from_row(row).map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata))]
    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<Booking>, PortError> {
        let row = self
            .bookings
            .find_by_payment_intent(intent_id)
            .await
            .map_err(db_to_port_error)?;
        row.map(booking_from_row)
            .transpose()
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata))]
    async fn find_bookings(
        &self,
        query: BookingQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Booking>, PortError> {
        query.validate()?;
        let filter = filter_from_query(&query);
        let rows = self.bookings.search(&filter).await.map_err(db_to_port_error)?;
        debug!(count = rows.len(), "Bookings found");
        rows.into_iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata), fields(boat_id = %boat_id))]
    async fn find_overlapping(
        &self,
        boat_id: BoatId,
        period: &RentalPeriod,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Booking>, PortError> {
        let rows = self
            .bookings
            .find_overlapping(boat_id.into(), period.start(), period.end())
            .await
            .map_err(db_to_port_error)?;
        rows.into_iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, booking, metadata), fields(booking_id = %booking.id, boat_id = %booking.boat_id))]
    async fn insert_booking(
        &self,
        booking: &Booking,
        metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError> {
        let row = row_from_booking(booking).map_err(db_to_port_error)?;
        let stored = self.bookings.insert(&row).await.map_err(db_to_port_error)?;
        let (initiated_by, correlation_id) = audit_fields(metadata.as_ref());
        debug!(initiated_by, correlation_id, "Booking row inserted");
        booking_from_row(stored).map_err(db_to_port_error)
    }

    #[instrument(skip(self, change, metadata), fields(booking_id = %id, to = %change.status))]
    async fn update_status(
        &self,
        id: BookingId,
        guard: StatusGuard,
        change: StatusChange,
        metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError> {
        let update = StatusUpdate {
            status: db_booking_status(change.status),
            payment_status: db_payment_status(change.payment_status),
            cancelled_by: change.cancelled_by.map(Into::into),
            cancelled_at: change.cancelled_at,
            updated_at: change.updated_at,
        };
        let row = self
            .bookings
            .update_status(
                id.into(),
                db_booking_status(guard.status),
                db_payment_status(guard.payment_status),
                &update,
            )
            .await
            .map_err(db_to_port_error)?;
        let (initiated_by, correlation_id) = audit_fields(metadata.as_ref());
        debug!(
            initiated_by,
            correlation_id,
            payment_status = %change.payment_status,
            "Booking status updated"
        );
        booking_from_row(row).map_err(db_to_port_error)
    }
}

/// Actor and correlation id for write logs; `-` when not supplied
fn audit_fields(metadata: Option<&OperationMetadata>) -> (&str, &str) {
    let initiated_by = metadata
        .and_then(|m| m.initiated_by.as_deref())
        .unwrap_or("-");
    let correlation_id = metadata
        .and_then(|m| m.correlation_id.as_deref())
        .unwrap_or("-");
    (initiated_by, correlation_id)
}

// ---------------------------------------------------------------------------
// Row <-> domain conversions
// ---------------------------------------------------------------------------

fn filter_from_query(query: &BookingQuery) -> BookingFilter {
    let scope = match query.scope {
        BookingScope::Renter(user) => FilterScope::Renter(user.into()),
        BookingScope::Host(user) => FilterScope::Host(user.into()),
        BookingScope::Participant(user) => FilterScope::Participant(user.into()),
        BookingScope::Everything => FilterScope::All,
    };
    BookingFilter {
        scope,
        status: query.status.map(db_booking_status),
        boat_id: query.boat_id.map(Into::into),
        limit: i64::from(query.limit),
        offset: i64::from(query.offset),
    }
}

fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    Currency::from_str(code)
        .map_err(|e| DatabaseError::CorruptRow(format!("currency '{code}': {e}")))
}

fn to_u32(value: i32, column: &str) -> Result<u32, DatabaseError> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::CorruptRow(format!("{column} out of range: {value}")))
}

fn to_i32(value: u32, column: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value)
        .map_err(|_| DatabaseError::CorruptRow(format!("{column} out of range: {value}")))
}

pub(crate) fn boat_from_row(row: BoatRow) -> Result<Boat, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    Ok(Boat {
        id: BoatId::from_uuid(row.boat_id),
        host_id: UserId::from_uuid(row.host_id),
        name: row.name,
        capacity: to_u32(row.capacity, "capacity")?,
        hourly_rate: Money::new(row.hourly_rate, currency),
        daily_rate: Money::new(row.daily_rate, currency),
        pricing_mode: match row.pricing_mode {
            DbPricingMode::Hourly => PricingMode::Hourly,
            DbPricingMode::Daily => PricingMode::Daily,
        },
        is_available: row.is_available,
        booking_count: row.booking_count,
    })
}

pub(crate) fn booking_from_row(row: BookingRow) -> Result<Booking, DatabaseError> {
    let currency = parse_currency(&row.currency)?;
    let period = RentalPeriod::new(row.start_at, row.end_at)
        .map_err(|e| DatabaseError::CorruptRow(format!("booking {}: {e}", row.booking_id)))?;

    Ok(Booking {
        id: BookingId::from_uuid(row.booking_id),
        renter_id: UserId::from_uuid(row.renter_id),
        boat_id: BoatId::from_uuid(row.boat_id),
        host_id: UserId::from_uuid(row.host_id),
        period,
        guest_count: to_u32(row.guest_count, "guest_count")?,
        special_requests: row.special_requests,
        price: PriceBreakdown {
            base: Money::new(row.base_amount, currency),
            service_fee: Money::new(row.service_fee, currency),
            total: Money::new(row.total_amount, currency),
        },
        payment_intent_id: row.payment_intent_id,
        status: domain_booking_status(row.status),
        payment_status: domain_payment_status(row.payment_status),
        cancelled_by: row.cancelled_by.map(UserId::from_uuid),
        cancelled_at: row.cancelled_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn row_from_booking(booking: &Booking) -> Result<BookingRow, DatabaseError> {
    Ok(BookingRow {
        booking_id: booking.id.into(),
        renter_id: booking.renter_id.into(),
        boat_id: booking.boat_id.into(),
        host_id: booking.host_id.into(),
        start_at: booking.period.start(),
        end_at: booking.period.end(),
        guest_count: to_i32(booking.guest_count, "guest_count")?,
        special_requests: booking.special_requests.clone(),
        base_amount: booking.price.base.amount(),
        service_fee: booking.price.service_fee.amount(),
        total_amount: booking.price.total.amount(),
        currency: booking.price.total.currency().code().to_string(),
        payment_intent_id: booking.payment_intent_id.clone(),
        status: db_booking_status(booking.status),
        payment_status: db_payment_status(booking.payment_status),
        cancelled_by: booking.cancelled_by.map(Into::into),
        cancelled_at: booking.cancelled_at,
        created_at: booking.created_at,
        updated_at: booking.updated_at,
    })
}

fn db_booking_status(status: BookingStatus) -> DbBookingStatus {
    match status {
        BookingStatus::Pending => DbBookingStatus::Pending,
        BookingStatus::Confirmed => DbBookingStatus::Confirmed,
        BookingStatus::Cancelled => DbBookingStatus::Cancelled,
    }
}

fn domain_booking_status(status: DbBookingStatus) -> BookingStatus {
    match status {
        DbBookingStatus::Pending => BookingStatus::Pending,
        DbBookingStatus::Confirmed => BookingStatus::Confirmed,
        DbBookingStatus::Cancelled => BookingStatus::Cancelled,
    }
}

fn db_payment_status(status: PaymentStatus) -> DbPaymentStatus {
    match status {
        PaymentStatus::Pending => DbPaymentStatus::Pending,
        PaymentStatus::Paid => DbPaymentStatus::Paid,
        PaymentStatus::Failed => DbPaymentStatus::Failed,
        PaymentStatus::Refunded => DbPaymentStatus::Refunded,
    }
}

fn domain_payment_status(status: DbPaymentStatus) -> PaymentStatus {
    match status {
        DbPaymentStatus::Pending => PaymentStatus::Pending,
        DbPaymentStatus::Paid => PaymentStatus::Paid,
        DbPaymentStatus::Failed => PaymentStatus::Failed,
        DbPaymentStatus::Refunded => PaymentStatus::Refunded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn boat() -> Boat {
        Boat::new(
            UserId::new(),
            "Sea Breeze",
            6,
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(800), Currency::USD),
        )
        .unwrap()
    }

    fn booking() -> Booking {
        let boat = boat();
        let start = Utc.with_ymd_and_hms(2030, 7, 1, 10, 0, 0).unwrap();
        let period = RentalPeriod::starting_at(start, Duration::hours(4)).unwrap();
        let price = domain_booking::compute_price(&boat, &period);
        Booking::pending(
            BookingId::new_v7(),
            UserId::new(),
            &boat,
            period,
            2,
            Some("Life jackets for kids".to_string()),
            price,
            Some("pi_123".to_string()),
            start - Duration::days(3),
        )
    }

    #[test]
    fn test_booking_row_round_trip_preserves_fields() {
        let mut original = booking();
        original.apply(&StatusChange::cancel(
            PaymentStatus::Refunded,
            original.renter_id,
            original.created_at + Duration::hours(1),
        ));

        let row = row_from_booking(&original).unwrap();
        assert_eq!(row.currency, "USD");
        assert_eq!(row.status, DbBookingStatus::Cancelled);

        let restored = booking_from_row(row).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_corrupt_period_is_reported() {
        let mut row = row_from_booking(&booking()).unwrap();
        row.end_at = row.start_at;
        let err = booking_from_row(row).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
        assert!(matches!(db_to_port_error(err), PortError::Transformation { .. }));
    }

    #[test]
    fn test_unknown_currency_is_corrupt() {
        let mut row = row_from_booking(&booking()).unwrap();
        row.currency = "XXX".to_string();
        assert!(matches!(booking_from_row(row), Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_audit_fields_default_to_dash() {
        assert_eq!(audit_fields(None), ("-", "-"));

        let metadata = OperationMetadata {
            correlation_id: Some("evt_1".to_string()),
            ..OperationMetadata::initiated_by("USR-1")
        };
        assert_eq!(audit_fields(Some(&metadata)), ("USR-1", "evt_1"));
    }

    #[test]
    fn test_filter_from_query() {
        let user = UserId::new();
        let boat_id = BoatId::new();
        let query = BookingQuery::for_scope(BookingScope::Participant(user))
            .with_status(BookingStatus::Confirmed)
            .with_boat(boat_id)
            .with_limit(20)
            .with_offset(40);

        let filter = filter_from_query(&query);
        assert_eq!(filter.scope, FilterScope::Participant(user.into()));
        assert_eq!(filter.status, Some(DbBookingStatus::Confirmed));
        assert_eq!(filter.boat_id, Some(boat_id.into()));
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.offset, 40);
    }

    #[test]
    fn test_boat_row_conversion() {
        let row = BoatRow {
            boat_id: uuid::Uuid::new_v4(),
            host_id: uuid::Uuid::new_v4(),
            name: "Daily Cruiser".to_string(),
            capacity: 10,
            hourly_rate: dec!(50),
            daily_rate: dec!(300),
            currency: "eur".to_string(),
            pricing_mode: DbPricingMode::Daily,
            is_available: false,
            booking_count: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let boat = boat_from_row(row).unwrap();
        assert_eq!(boat.pricing_mode, PricingMode::Daily);
        assert_eq!(boat.daily_rate, Money::new(dec!(300), Currency::EUR));
        assert!(!boat.is_available);
        assert_eq!(boat.booking_count, 7);
    }
}
