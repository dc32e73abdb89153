//! Booking Aggregate
//!
//! A booking reserves one boat for a half-open period and tracks two
//! independent state machines:
//!
//! ```text
//! status:          pending ──► confirmed ──► cancelled
//!                     └──────────────────────▲
//!
//! payment_status:  pending ──► paid ──► refunded
//!                     └──────► failed
//! ```
//!
//! # Invariants
//!
//! - `cancelled` is terminal
//! - A host can only confirm once payment is `paid`
//! - For one boat, no two non-cancelled bookings overlap (enforced by the store)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BoatId, BookingId, RentalPeriod, UserId};

use crate::boat::Boat;
use crate::error::BookingError;
use crate::pricing::PriceBreakdown;

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `target`
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        matches!(
            (self, target),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::validation(format!("Unknown booking status: {other}"))),
        }
    }
}

/// Payment status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(BookingError::validation(format!("Unknown payment status: {other}"))),
        }
    }
}

/// The `(status, payment_status)` pair a conditional update expects to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusGuard {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

/// New state written by a conditional update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Set only when this change cancels the booking
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StatusChange {
    /// A change that keeps any cancellation fields as they are
    pub fn to(status: BookingStatus, payment_status: PaymentStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            payment_status,
            cancelled_by: None,
            cancelled_at: None,
            updated_at: at,
        }
    }

    /// Cancels the booking on behalf of `actor`
    pub fn cancel(payment_status: PaymentStatus, actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            status: BookingStatus::Cancelled,
            payment_status,
            cancelled_by: Some(actor),
            cancelled_at: Some(at),
            updated_at: at,
        }
    }
}

/// A reservation of a boat for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub renter_id: UserId,
    pub boat_id: BoatId,
    /// Host of the boat at booking time
    pub host_id: UserId,
    pub period: RentalPeriod,
    pub guest_count: u32,
    pub special_requests: Option<String>,
    pub price: PriceBreakdown,
    /// Gateway payment intent reference
    pub payment_intent_id: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new `pending`/`pending` booking of `boat`
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        id: BookingId,
        renter_id: UserId,
        boat: &Boat,
        period: RentalPeriod,
        guest_count: u32,
        special_requests: Option<String>,
        price: PriceBreakdown,
        payment_intent_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            renter_id,
            boat_id: boat.id,
            host_id: boat.host_id,
            period,
            guest_count,
            special_requests,
            price,
            payment_intent_id,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancelled_by: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_renter(&self, user: UserId) -> bool {
        self.renter_id == user
    }

    pub fn is_host(&self, user: UserId) -> bool {
        self.host_id == user
    }

    /// Renter or host
    pub fn is_participant(&self, user: UserId) -> bool {
        self.is_renter(user) || self.is_host(user)
    }

    /// Whether this booking still blocks its period
    pub fn holds_period(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// The state a conditional update must match
    pub fn guard(&self) -> StatusGuard {
        StatusGuard {
            status: self.status,
            payment_status: self.payment_status,
        }
    }

    /// Whether `guard` describes the current state
    pub fn matches(&self, guard: &StatusGuard) -> bool {
        self.guard() == *guard
    }

    /// Whether `change` would leave the booking as it is
    pub fn is_noop(&self, change: &StatusChange) -> bool {
        self.status == change.status
            && self.payment_status == change.payment_status
            && (change.cancelled_by.is_none() || self.cancelled_by == change.cancelled_by)
    }

    /// Applies a status change in place
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        self.payment_status = change.payment_status;
        if change.cancelled_by.is_some() {
            self.cancelled_by = change.cancelled_by;
        }
        if change.cancelled_at.is_some() {
            self.cancelled_at = change.cancelled_at;
        }
        self.updated_at = change.updated_at;
    }
}
