//! Booking lifecycle service
//!
//! Orchestrates the boat and booking ports, the availability checker, the
//! price calculator and the payment gateway. It holds no locks: double
//! bookings are rejected by the store on insert, and every status write is a
//! conditional update guarded on the previously read `(status, payment_status)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{
    BoatId, BookingId, Clock, HealthCheckResult, OperationMetadata, PortError, RentalPeriod,
    UserId,
};
use domain_payment::{CreateIntentRequest, IntentStatus, PaymentEvent, PaymentEventKind, PaymentGateway};

use crate::actor::{Actor, SystemActors};
use crate::availability::AvailabilityChecker;
use crate::booking::{Booking, BookingStatus, PaymentStatus, StatusChange};
use crate::error::BookingError;
use crate::ports::{BoatPort, BookingPort, BookingQuery, BookingScope, DEFAULT_LIMIT};
use crate::pricing::compute_price;

/// Longest accepted special-requests text, in characters
pub const MAX_SPECIAL_REQUESTS_CHARS: usize = 1000;

/// Attempts at a conditional update before giving up on a moving booking
pub const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Input for [`BookingService::create`]
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBooking {
    pub boat_id: BoatId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub guest_count: u32,
    pub special_requests: Option<String>,
}

/// A stored booking plus the secret the renter needs to pay for it
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub client_secret: Option<String>,
}

/// Result of a manual payment reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The intent succeeded; the booking is now confirmed and paid
    Paid(Booking),
    /// The intent failed; payment is now marked failed
    Failed(Booking),
    /// The renter still has to complete payment; nothing changed
    Incomplete(IntentStatus),
    /// The gateway is still working on it; nothing changed
    InProgress(IntentStatus),
}

/// Result of processing a webhook event
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The booking was updated
    Applied(Booking),
    /// The booking already reflected the event
    Unchanged(Booking),
    /// No booking references the intent; the event is dropped
    UnknownIntent(String),
    /// The event type does not concern bookings
    Ignored(String),
}

/// Whose bookings a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    AsRenter,
    AsHost,
    /// Both roles; every booking for admins
    #[default]
    All,
}

/// Listing filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBookings {
    pub scope: ListScope,
    pub status: Option<BookingStatus>,
    pub boat_id: Option<BoatId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// The booking lifecycle manager
pub struct BookingService {
    boats: Arc<dyn BoatPort>,
    bookings: Arc<dyn BookingPort>,
    gateway: Arc<dyn PaymentGateway>,
    availability: AvailabilityChecker,
    clock: Arc<dyn Clock>,
    actors: SystemActors,
}

impl BookingService {
    pub fn new(
        boats: Arc<dyn BoatPort>,
        bookings: Arc<dyn BookingPort>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        actors: SystemActors,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(bookings.clone()),
            boats,
            bookings,
            gateway,
            clock,
            actors,
        }
    }

    pub fn actors(&self) -> &SystemActors {
        &self.actors
    }

    pub fn availability(&self) -> &AvailabilityChecker {
        &self.availability
    }

    /// Creates a pending booking and its payment intent
    ///
    /// Nothing is stored if validation, the availability check or intent
    /// creation fails. If the insert itself fails after the intent was
    /// created, the intent is left orphaned and logged for reconciliation.
    #[instrument(skip(self, request), fields(boat_id = %request.boat_id, renter_id = %renter_id))]
    pub async fn create(
        &self,
        renter_id: UserId,
        request: CreateBooking,
    ) -> Result<CreatedBooking, BookingError> {
        let now = self.clock.now();
        let period = RentalPeriod::new(request.start, request.end)?;
        period.ensure_not_in_past(now)?;
        if request.guest_count == 0 {
            return Err(BookingError::validation("guest_count must be at least 1"));
        }
        let special_requests = normalize_special_requests(request.special_requests)?;

        let metadata = Some(OperationMetadata::initiated_by(renter_id));
        let boat = self
            .boats
            .get_boat(request.boat_id, metadata.clone())
            .await
            .map_err(BookingError::from_storage)?;
        if !boat.is_available {
            return Err(BookingError::validation("Boat is not available for booking"));
        }
        if !boat.fits(request.guest_count) {
            return Err(BookingError::validation(format!(
                "Guest count {} exceeds boat capacity {}",
                request.guest_count, boat.capacity
            )));
        }

        if self.availability.has_overlap(boat.id, &period).await? {
            return Err(BookingError::conflict(
                "Boat is already booked for the requested period",
            ));
        }

        let price = compute_price(&boat, &period);
        let amount_minor = price.total.to_minor_units()?;
        let booking_id = BookingId::new_v7();

        let intent_request = CreateIntentRequest::new(amount_minor, price.total.currency())
            .with_metadata("booking_id", booking_id.to_string())
            .with_metadata("booking_renter_id", renter_id.to_string())
            .with_metadata("boat_id", boat.id.to_string())
            .with_metadata("start", period.start().to_rfc3339())
            .with_metadata("end", period.end().to_rfc3339())
            .with_idempotency_key(booking_id.to_string());
        let intent = self.gateway.create_intent(intent_request).await.map_err(|e| {
            warn!(error = %e, "Payment intent creation failed");
            BookingError::PaymentGateway(e)
        })?;

        let booking = Booking::pending(
            booking_id,
            renter_id,
            &boat,
            period,
            request.guest_count,
            special_requests,
            price,
            Some(intent.id.clone()),
            now,
        );
        let booking = match self.bookings.insert_booking(&booking, metadata.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    booking_id = %booking_id,
                    intent_id = %intent.id,
                    amount_minor,
                    error = %e,
                    "Booking insert failed; payment intent is orphaned"
                );
                return Err(BookingError::from_storage(e));
            }
        };

        if let Err(e) = self.boats.increment_booking_count(boat.id, metadata).await {
            warn!(boat_id = %boat.id, error = %e, "Failed to increment boat booking count");
        }

        info!(
            booking_id = %booking.id,
            intent_id = %intent.id,
            total = %booking.price.total,
            "Booking created"
        );
        Ok(CreatedBooking {
            booking,
            client_secret: intent.client_secret,
        })
    }

    /// Moves a booking to `confirmed` or `cancelled` on behalf of `actor_id`
    #[instrument(skip(self), fields(booking_id = %booking_id, actor_id = %actor_id, target = %target))]
    pub async fn transition(
        &self,
        booking_id: BookingId,
        actor_id: UserId,
        target: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let booking = self.load(booking_id).await?;
        if !booking.is_participant(actor_id) {
            return Err(BookingError::forbidden(
                "Only the renter or the host can change this booking",
            ));
        }

        let now = self.clock.now();
        match target {
            BookingStatus::Confirmed => self.confirm(booking, actor_id, now).await,
            BookingStatus::Cancelled => self.cancel(booking, actor_id, now).await,
            BookingStatus::Pending => Err(BookingError::validation(
                "A booking cannot be moved back to pending",
            )),
        }
    }

    async fn confirm(
        &self,
        booking: Booking,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        if !booking.is_host(actor_id) {
            return Err(BookingError::forbidden("Only the host can confirm a booking"));
        }
        if booking.status == BookingStatus::Confirmed
            && booking.payment_status == PaymentStatus::Paid
        {
            debug!(booking_id = %booking.id, "Booking already confirmed");
            return Ok(booking);
        }
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::invalid_transition(format!(
                "Cannot confirm a {} booking",
                booking.status
            )));
        }
        if booking.payment_status != PaymentStatus::Paid {
            return Err(BookingError::invalid_transition(format!(
                "Cannot confirm before payment is completed (payment is {})",
                booking.payment_status
            )));
        }

        let change = StatusChange::to(BookingStatus::Confirmed, PaymentStatus::Paid, now);
        let updated = self
            .bookings
            .update_status(booking.id, booking.guard(), change, Some(OperationMetadata::initiated_by(actor_id)))
            .await
            .map_err(BookingError::from_storage)?;
        info!(booking_id = %updated.id, "Booking confirmed by host");
        Ok(updated)
    }

    async fn cancel(
        &self,
        booking: Booking,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::invalid_transition("Booking is already cancelled"));
        }
        let metadata = Some(OperationMetadata::initiated_by(actor_id));

        if booking.payment_status != PaymentStatus::Paid {
            let change = StatusChange::cancel(booking.payment_status, actor_id, now);
            let updated = self
                .bookings
                .update_status(booking.id, booking.guard(), change, metadata)
                .await
                .map_err(BookingError::from_storage)?;
            info!(booking_id = %updated.id, "Booking cancelled");
            return Ok(updated);
        }

        let intent_id = booking.payment_intent_id.as_deref().ok_or_else(|| {
            BookingError::RefundFailed(PortError::validation(
                "Booking is paid but has no payment intent to refund",
            ))
        })?;
        let refund = self.gateway.create_refund(intent_id, None).await.map_err(|e| {
            error!(booking_id = %booking.id, intent_id, error = %e, "Refund failed; booking left unchanged");
            BookingError::RefundFailed(e)
        })?;
        info!(booking_id = %booking.id, refund_id = %refund.id, amount_minor = refund.amount, "Refund issued");

        // The refund has gone through, so the cancellation must be recorded
        // even if the booking moved in the meantime.
        let (updated, _) = self
            .apply_with_retry(booking, metadata, |current| {
                if current.status == BookingStatus::Cancelled {
                    Some(StatusChange::to(BookingStatus::Cancelled, PaymentStatus::Refunded, now))
                } else {
                    Some(StatusChange::cancel(PaymentStatus::Refunded, actor_id, now))
                }
            })
            .await?;
        info!(booking_id = %updated.id, "Paid booking cancelled and refunded");
        Ok(updated)
    }

    /// Pulls the intent state from the gateway and records it
    #[instrument(skip(self), fields(booking_id = %booking_id, actor_id = %actor_id))]
    pub async fn reconcile_payment(
        &self,
        booking_id: BookingId,
        actor_id: UserId,
    ) -> Result<ReconcileOutcome, BookingError> {
        let booking = self.load(booking_id).await?;
        if !booking.is_participant(actor_id) {
            return Err(BookingError::forbidden(
                "Only the renter or the host can reconcile this booking",
            ));
        }
        let intent_id = booking
            .payment_intent_id
            .clone()
            .ok_or_else(|| BookingError::validation("Booking has no payment intent"))?;
        if booking.payment_status == PaymentStatus::Paid {
            return Err(BookingError::conflict("Payment is already confirmed"));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::invalid_transition(
                "Cannot reconcile payment of a cancelled booking",
            ));
        }

        let intent = self
            .gateway
            .retrieve_intent(&intent_id)
            .await
            .map_err(BookingError::PaymentGateway)?;
        debug!(intent_id = %intent.id, status = %intent.status, "Retrieved payment intent");

        let now = self.clock.now();
        let metadata = Some(OperationMetadata::initiated_by(actor_id));
        match intent.status {
            IntentStatus::Succeeded => {
                let change = StatusChange::to(BookingStatus::Confirmed, PaymentStatus::Paid, now);
                let updated = self
                    .bookings
                    .update_status(booking.id, booking.guard(), change, metadata)
                    .await
                    .map_err(BookingError::from_storage)?;
                info!(booking_id = %updated.id, "Payment reconciled as paid");
                Ok(ReconcileOutcome::Paid(updated))
            }
            IntentStatus::PaymentFailed => {
                let change = StatusChange::to(booking.status, PaymentStatus::Failed, now);
                let updated = self
                    .bookings
                    .update_status(booking.id, booking.guard(), change, metadata)
                    .await
                    .map_err(BookingError::from_storage)?;
                info!(booking_id = %updated.id, "Payment reconciled as failed");
                Ok(ReconcileOutcome::Failed(updated))
            }
            status if status.awaits_customer() => Ok(ReconcileOutcome::Incomplete(status)),
            status => Ok(ReconcileOutcome::InProgress(status)),
        }
    }

    /// Applies a verified gateway event to the booking it concerns
    ///
    /// Re-applying an event leaves the booking as it is. A cancelled booking
    /// never leaves `cancelled`.
    #[instrument(skip(self, event), fields(event_id = %event.id, intent_id = %event.object_id))]
    pub async fn on_payment_webhook(
        &self,
        event: &PaymentEvent,
    ) -> Result<WebhookOutcome, BookingError> {
        let Some(intent_id) = event.intent_id() else {
            debug!(kind = ?event.kind, "Ignoring webhook event");
            let label = match &event.kind {
                PaymentEventKind::Other(name) => name.clone(),
                other => format!("{other:?}"),
            };
            return Ok(WebhookOutcome::Ignored(label));
        };

        let metadata = Some(OperationMetadata {
            correlation_id: Some(event.id.clone()),
            initiated_by: Some(self.actors.system.to_string()),
            ..Default::default()
        });
        let Some(booking) = self
            .bookings
            .find_by_payment_intent(intent_id, metadata.clone())
            .await
            .map_err(BookingError::Storage)?
        else {
            warn!(intent_id, "No booking references this payment intent; dropping event");
            return Ok(WebhookOutcome::UnknownIntent(intent_id.to_string()));
        };

        let now = self.clock.now();
        let system = self.actors.system;
        let kind = event.kind.clone();
        let (booking, changed) = self
            .apply_with_retry(booking, metadata, |current| {
                plan_for_event(&kind, current, system, now)
            })
            .await?;

        if changed {
            info!(
                booking_id = %booking.id,
                status = %booking.status,
                payment_status = %booking.payment_status,
                "Webhook applied"
            );
            Ok(WebhookOutcome::Applied(booking))
        } else {
            debug!(booking_id = %booking.id, "Webhook already reflected");
            Ok(WebhookOutcome::Unchanged(booking))
        }
    }

    /// Fetches a booking visible to `actor`
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn get(&self, booking_id: BookingId, actor: &Actor) -> Result<Booking, BookingError> {
        let booking = self.load(booking_id).await?;
        if booking.is_participant(actor.id) || self.actors.is_admin(actor) {
            Ok(booking)
        } else {
            Err(BookingError::forbidden("You cannot view this booking"))
        }
    }

    /// Lists bookings visible to `actor`
    #[instrument(skip(self, request))]
    pub async fn list(
        &self,
        actor: &Actor,
        request: ListBookings,
    ) -> Result<Vec<Booking>, BookingError> {
        let scope = match request.scope {
            ListScope::AsRenter => BookingScope::Renter(actor.id),
            ListScope::AsHost => BookingScope::Host(actor.id),
            ListScope::All if self.actors.is_admin(actor) => BookingScope::Everything,
            ListScope::All => BookingScope::Participant(actor.id),
        };

        let mut query = BookingQuery::for_scope(scope)
            .with_limit(request.limit.unwrap_or(DEFAULT_LIMIT))
            .with_offset(request.offset.unwrap_or(0));
        if let Some(status) = request.status {
            query = query.with_status(status);
        }
        if let Some(boat_id) = request.boat_id {
            query = query.with_boat(boat_id);
        }
        query.validate().map_err(BookingError::from_storage)?;

        self.bookings
            .find_bookings(query, Some(OperationMetadata::initiated_by(actor.id)))
            .await
            .map_err(BookingError::from_storage)
    }

    /// Health of every adapter the service depends on
    pub async fn health(&self) -> Vec<HealthCheckResult> {
        vec![
            self.bookings.health_check().await,
            self.boats.health_check().await,
            self.gateway.health_check().await,
        ]
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(booking_id, None)
            .await
            .map_err(BookingError::from_storage)
    }

    /// Plans and writes a change, re-reading the booking when the guard fails
    ///
    /// Returns the resulting booking and whether anything was written.
    async fn apply_with_retry<F>(
        &self,
        mut current: Booking,
        metadata: Option<OperationMetadata>,
        plan: F,
    ) -> Result<(Booking, bool), BookingError>
    where
        F: Fn(&Booking) -> Option<StatusChange>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let Some(change) = plan(&current) else {
                return Ok((current, false));
            };
            if current.is_noop(&change) {
                return Ok((current, false));
            }

            match self
                .bookings
                .update_status(current.id, current.guard(), change, metadata.clone())
                .await
            {
                Ok(updated) => return Ok((updated, true)),
                Err(PortError::Conflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(booking_id = %current.id, attempt, "Booking changed concurrently; retrying");
                    current = self.load(current.id).await?;
                }
                Err(e) => return Err(BookingError::from_storage(e)),
            }
        }
        Err(BookingError::conflict(format!(
            "Booking {} kept changing during update",
            current.id
        )))
    }
}

fn normalize_special_requests(text: Option<String>) -> Result<Option<String>, BookingError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_SPECIAL_REQUESTS_CHARS {
        return Err(BookingError::validation(format!(
            "special_requests cannot exceed {MAX_SPECIAL_REQUESTS_CHARS} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// The change a webhook event asks for, or `None` when it asks for nothing
fn plan_for_event(
    kind: &PaymentEventKind,
    current: &Booking,
    system: UserId,
    now: DateTime<Utc>,
) -> Option<StatusChange> {
    match kind {
        PaymentEventKind::Succeeded => {
            if current.status != BookingStatus::Cancelled {
                return Some(StatusChange::to(BookingStatus::Confirmed, PaymentStatus::Paid, now));
            }
            match current.payment_status {
                PaymentStatus::Paid | PaymentStatus::Refunded => None,
                _ => {
                    warn!(
                        booking_id = %current.id,
                        intent_id = ?current.payment_intent_id,
                        "Payment succeeded for a cancelled booking; manual refund required"
                    );
                    Some(StatusChange::to(BookingStatus::Cancelled, PaymentStatus::Paid, now))
                }
            }
        }
        PaymentEventKind::PaymentFailed => match current.payment_status {
            PaymentStatus::Refunded => None,
            _ => Some(StatusChange::to(current.status, PaymentStatus::Failed, now)),
        },
        PaymentEventKind::Canceled => {
            let payment = match current.payment_status {
                PaymentStatus::Paid | PaymentStatus::Refunded => current.payment_status,
                PaymentStatus::Pending | PaymentStatus::Failed => PaymentStatus::Failed,
            };
            if current.status == BookingStatus::Cancelled {
                Some(StatusChange::to(BookingStatus::Cancelled, payment, now))
            } else {
                Some(StatusChange::cancel(payment, system, now))
            }
        }
        PaymentEventKind::Other(_) => None,
    }
}
