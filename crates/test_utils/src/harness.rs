//! In-memory service harness
//!
//! Wires a [`BookingService`] to the in-memory store, the mock gateway, and a
//! frozen clock, with the reference boat already listed.

use std::sync::Arc;

use core_kernel::{FixedClock, UserId};
use domain_booking::ports::mock::InMemoryBookingStore;
use domain_booking::{Boat, BookingService, SystemActors};
use domain_payment::ports::mock::MockPaymentGateway;

use crate::fixtures::{ActorFixtures, BoatFixtures, TemporalFixtures};

/// Booking service over in-memory adapters
pub struct InMemoryHarness {
    pub service: Arc<BookingService>,
    pub store: Arc<InMemoryBookingStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub clock: Arc<FixedClock>,
    pub actors: SystemActors,
    /// The reference boat, hosted by `host`
    pub boat: Boat,
    pub host: UserId,
    pub renter: UserId,
}

impl InMemoryHarness {
    /// A harness with the reference boat listed and the clock at
    /// [`TemporalFixtures::now`]
    pub async fn new() -> Self {
        let host = UserId::new();
        let boat = BoatFixtures::reference(host);
        let store = Arc::new(InMemoryBookingStore::with_boats(vec![boat.clone()]).await);
        let gateway = Arc::new(MockPaymentGateway::new());
        let clock = Arc::new(TemporalFixtures::clock());
        let actors = ActorFixtures::system_actors();
        let service = Arc::new(BookingService::new(
            store.clone(),
            store.clone(),
            gateway.clone(),
            clock.clone(),
            actors,
        ));

        Self {
            service,
            store,
            gateway,
            clock,
            actors,
            boat,
            host,
            renter: UserId::new(),
        }
    }

    /// Lists another boat
    pub async fn add_boat(&self, boat: Boat) {
        self.store.add_boat(boat).await;
    }
}
