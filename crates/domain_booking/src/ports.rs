//! Booking Domain Ports
//!
//! Persistence ports for boats and bookings. Adapters:
//!
//! - **PostgreSQL adapter**: `infra_db::adapters::PostgresBookingAdapter`
//! - **In-memory adapter**: [`mock::InMemoryBookingStore`] for tests
//!
//! # Consistency contract
//!
//! Every adapter must uphold two rules at the storage boundary, so that the
//! service never has to lock across I/O:
//!
//! - `insert_booking` fails with `PortError::Conflict` when the new booking
//!   overlaps a non-cancelled booking of the same boat
//! - `update_status` writes only if the stored `(status, payment_status)` still
//!   equals the guard, and fails with `PortError::Conflict` otherwise
//!
//! # Usage
//!
//! ```rust,ignore
//! let query = BookingQuery::for_scope(BookingScope::Renter(user_id))
//!     .with_status(BookingStatus::Pending)
//!     .with_limit(20);
//! query.validate()?;
//! let bookings = booking_port.find_bookings(query, None).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{
    BoatId, BookingId, DomainPort, HealthCheckable, OperationMetadata, PortError, RentalPeriod,
    UserId,
};

use crate::boat::Boat;
use crate::booking::{Booking, BookingStatus, StatusChange, StatusGuard};

/// Default page size for booking listings
pub const DEFAULT_LIMIT: u32 = 50;

/// Largest page size a listing may request
pub const MAX_LIMIT: u32 = 100;

/// Whose bookings a query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    /// Bookings made by this renter
    Renter(UserId),
    /// Bookings of boats hosted by this user
    Host(UserId),
    /// Bookings where this user is renter or host
    Participant(UserId),
    /// Every booking
    Everything,
}

/// Typed filter for booking listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    pub scope: BookingScope,
    pub status: Option<BookingStatus>,
    pub boat_id: Option<BoatId>,
    pub limit: u32,
    pub offset: u32,
}

impl BookingQuery {
    /// A first page of the given scope
    pub fn for_scope(scope: BookingScope) -> Self {
        Self {
            scope,
            status: None,
            boat_id: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_boat(mut self, boat_id: BoatId) -> Self {
        self.boat_id = Some(boat_id);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Rejects queries no adapter should run
    pub fn validate(&self) -> Result<(), PortError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(PortError::validation_field(
                format!("limit must be between 1 and {MAX_LIMIT}"),
                "limit",
            ));
        }
        Ok(())
    }

    /// Whether `booking` is selected by this query, ignoring paging
    pub fn matches(&self, booking: &Booking) -> bool {
        let in_scope = match self.scope {
            BookingScope::Renter(user) => booking.is_renter(user),
            BookingScope::Host(user) => booking.is_host(user),
            BookingScope::Participant(user) => booking.is_participant(user),
            BookingScope::Everything => true,
        };
        in_scope
            && self.status.map_or(true, |s| booking.status == s)
            && self.boat_id.map_or(true, |b| booking.boat_id == b)
    }
}

/// Read access to boats plus the booking counter
#[async_trait]
pub trait BoatPort: DomainPort + HealthCheckable {
    /// Retrieves a boat by id
    async fn get_boat(
        &self,
        id: BoatId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Boat, PortError>;

    /// Adds one to the boat's booking counter
    async fn increment_booking_count(
        &self,
        id: BoatId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

/// Booking persistence
#[async_trait]
pub trait BookingPort: DomainPort + HealthCheckable {
    /// Retrieves a booking by id
    async fn get_booking(
        &self,
        id: BookingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError>;

    /// Finds the booking that references a payment intent
    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<Booking>, PortError>;

    /// Lists bookings matching a validated query, newest first
    async fn find_bookings(
        &self,
        query: BookingQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Booking>, PortError>;

    /// Non-cancelled bookings of `boat_id` overlapping `period`
    async fn find_overlapping(
        &self,
        boat_id: BoatId,
        period: &RentalPeriod,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Booking>, PortError>;

    /// Stores a new booking; `Conflict` if its period is already taken
    async fn insert_booking(
        &self,
        booking: &Booking,
        metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError>;

    /// Conditionally updates status fields; `Conflict` if the guard no longer holds
    async fn update_status(
        &self,
        id: BookingId,
        guard: StatusGuard,
        change: StatusChange,
        metadata: Option<OperationMetadata>,
    ) -> Result<Booking, PortError>;
}

/// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::HealthCheckResult;

    /// In-memory store for boats and bookings
    ///
    /// Overlap and guard checks run under the write lock, giving the same
    /// guarantees as the database constraints.
    #[derive(Debug, Default)]
    pub struct InMemoryBookingStore {
        boats: Arc<RwLock<HashMap<BoatId, Boat>>>,
        bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
        fail_next_insert: AtomicBool,
        fail_next_increment: AtomicBool,
        interleaved_write: Mutex<Option<Booking>>,
    }

    impl InMemoryBookingStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with boats for testing
        pub async fn with_boats(boats: Vec<Boat>) -> Self {
            let store = Self::new();
            for boat in boats {
                store.add_boat(boat).await;
            }
            store
        }

        pub async fn add_boat(&self, boat: Boat) {
            self.boats.write().await.insert(boat.id, boat);
        }

        /// Stores a booking as-is, bypassing the overlap check
        pub async fn put_booking(&self, booking: Booking) {
            self.bookings.write().await.insert(booking.id, booking);
        }

        /// Returns a boat snapshot
        pub async fn boat(&self, id: BoatId) -> Option<Boat> {
            self.boats.read().await.get(&id).cloned()
        }

        /// Returns every stored booking
        pub async fn all_bookings(&self) -> Vec<Booking> {
            self.bookings.read().await.values().cloned().collect()
        }

        /// Makes the next insert fail with a connection error
        pub fn fail_next_insert(&self) {
            self.fail_next_insert.store(true, Ordering::SeqCst);
        }

        /// Makes the next counter increment fail with a connection error
        pub fn fail_next_increment(&self) {
            self.fail_next_increment.store(true, Ordering::SeqCst);
        }

        /// Stores `booking` as-is just before the next insert or status update
        ///
        /// Stands in for another writer committing between a caller's read and
        /// its write.
        pub async fn interleave_next_write(&self, booking: Booking) {
            *self.interleaved_write.lock().await = Some(booking);
        }

        async fn apply_interleaved(&self, bookings: &mut HashMap<BookingId, Booking>) {
            if let Some(booking) = self.interleaved_write.lock().await.take() {
                bookings.insert(booking.id, booking);
            }
        }
    }

    impl DomainPort for InMemoryBookingStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryBookingStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-booking-store")
        }
    }

    #[async_trait]
    impl BoatPort for InMemoryBookingStore {
        async fn get_boat(
            &self,
            id: BoatId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Boat, PortError> {
            self.boats
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Boat", id))
        }

        async fn increment_booking_count(
            &self,
            id: BoatId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            if self.fail_next_increment.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("in-memory store unavailable"));
            }
            let mut boats = self.boats.write().await;
            let boat = boats
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Boat", id))?;
            boat.booking_count += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl BookingPort for InMemoryBookingStore {
        async fn get_booking(
            &self,
            id: BookingId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Booking, PortError> {
            self.bookings
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Booking", id))
        }

        async fn find_by_payment_intent(
            &self,
            intent_id: &str,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Option<Booking>, PortError> {
            Ok(self
                .bookings
                .read()
                .await
                .values()
                .find(|b| b.payment_intent_id.as_deref() == Some(intent_id))
                .cloned())
        }

        async fn find_bookings(
            &self,
            query: BookingQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Booking>, PortError> {
            query.validate()?;
            let mut found: Vec<Booking> = self
                .bookings
                .read()
                .await
                .values()
                .filter(|b| query.matches(b))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(found
                .into_iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .collect())
        }

        async fn find_overlapping(
            &self,
            boat_id: BoatId,
            period: &RentalPeriod,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Booking>, PortError> {
            Ok(self
                .bookings
                .read()
                .await
                .values()
                .filter(|b| b.boat_id == boat_id && b.holds_period() && b.period.overlaps(period))
                .cloned()
                .collect())
        }

        async fn insert_booking(
            &self,
            booking: &Booking,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Booking, PortError> {
            if self.fail_next_insert.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("in-memory store unavailable"));
            }
            let mut bookings = self.bookings.write().await;
            self.apply_interleaved(&mut bookings).await;
            if bookings.contains_key(&booking.id) {
                return Err(PortError::conflict(format!("Booking {} already exists", booking.id)));
            }
            let taken = bookings.values().any(|b| {
                b.boat_id == booking.boat_id && b.holds_period() && b.period.overlaps(&booking.period)
            });
            if taken && booking.holds_period() {
                return Err(PortError::conflict(
                    "Boat is already booked for an overlapping period",
                ));
            }
            bookings.insert(booking.id, booking.clone());
            Ok(booking.clone())
        }

        async fn update_status(
            &self,
            id: BookingId,
            guard: StatusGuard,
            change: StatusChange,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Booking, PortError> {
            let mut bookings = self.bookings.write().await;
            self.apply_interleaved(&mut bookings).await;
            let booking = bookings
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Booking", id))?;
            if !booking.matches(&guard) {
                return Err(PortError::conflict(format!(
                    "Booking {id} changed concurrently (now {}/{})",
                    booking.status, booking.payment_status
                )));
            }
            booking.apply(&change);
            Ok(booking.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryBookingStore;
    use super::*;
    use crate::booking::PaymentStatus;
    use crate::pricing::compute_price;
    use chrono::{Duration, TimeZone, Utc};
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn boat() -> Boat {
        Boat::new(
            UserId::new(),
            "Test",
            6,
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(800), Currency::USD),
        )
        .unwrap()
    }

    fn booking(boat: &Boat, start_hour: u32, hours: i64) -> Booking {
        let start = Utc.with_ymd_and_hms(2030, 7, 1, start_hour, 0, 0).unwrap();
        let period = RentalPeriod::starting_at(start, Duration::hours(hours)).unwrap();
        let price = compute_price(boat, &period);
        Booking::pending(
            BookingId::new_v7(),
            UserId::new(),
            boat,
            period,
            2,
            None,
            price,
            Some(format!("pi_{start_hour}")),
            start - Duration::days(1),
        )
    }

    #[test]
    fn test_query_limit_bounds() {
        let query = BookingQuery::for_scope(BookingScope::Everything);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert!(query.validate().is_ok());
        assert!(query.clone().with_limit(0).validate().is_err());
        assert!(query.clone().with_limit(MAX_LIMIT).validate().is_ok());
        assert!(query.with_limit(MAX_LIMIT + 1).validate().is_err());
    }

    #[tokio::test]
    async fn test_insert_rejects_overlap_and_allows_adjacent() {
        let boat = boat();
        let store = InMemoryBookingStore::with_boats(vec![boat.clone()]).await;

        store.insert_booking(&booking(&boat, 10, 2), None).await.unwrap();
        let overlap = store.insert_booking(&booking(&boat, 11, 2), None).await;
        assert!(matches!(overlap, Err(PortError::Conflict { .. })));
        assert!(store.insert_booking(&booking(&boat, 12, 2), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_status_checks_guard() {
        let boat = boat();
        let store = InMemoryBookingStore::new();
        let b = store.insert_booking(&booking(&boat, 10, 2), None).await.unwrap();
        let now = Utc::now();

        let change = StatusChange::to(BookingStatus::Confirmed, PaymentStatus::Paid, now);
        let updated = store
            .update_status(b.id, b.guard(), change.clone(), None)
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Confirmed);

        let stale = store.update_status(b.id, b.guard(), change, None).await;
        assert!(matches!(stale, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_find_bookings_scopes() {
        let boat = boat();
        let store = InMemoryBookingStore::new();
        let a = store.insert_booking(&booking(&boat, 8, 1), None).await.unwrap();
        store.insert_booking(&booking(&boat, 12, 1), None).await.unwrap();

        let mine = store
            .find_bookings(BookingQuery::for_scope(BookingScope::Renter(a.renter_id)), None)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        let hosted = store
            .find_bookings(BookingQuery::for_scope(BookingScope::Host(boat.host_id)), None)
            .await
            .unwrap();
        assert_eq!(hosted.len(), 2);

        let paged = store
            .find_bookings(
                BookingQuery::for_scope(BookingScope::Everything).with_limit(1).with_offset(1),
                None,
            )
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
    }
}
