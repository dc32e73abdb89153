//! Booking DTOs
//!
//! Response bodies are built from domain values, never from database rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{BoatId, BookingId, UserId};
use domain_booking::{
    Booking, BookingStatus, CreateBooking, CreatedBooking, ListBookings, ListScope, PaymentStatus,
    ReconcileOutcome, MAX_SPECIAL_REQUESTS_CHARS,
};
use domain_payment::IntentStatus;

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_period"))]
pub struct CreateBookingRequest {
    pub boat_id: BoatId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[validate(range(min = 1, message = "at least one guest is required"))]
    pub guest_count: u32,
    #[validate(custom(function = "validate_special_requests"))]
    pub special_requests: Option<String>,
}

/// Counts characters after trimming, as the booking service does
fn validate_special_requests(text: &str) -> Result<(), ValidationError> {
    if text.trim().chars().count() > MAX_SPECIAL_REQUESTS_CHARS {
        let mut error = ValidationError::new("length");
        error.message = Some(format!("must be at most {MAX_SPECIAL_REQUESTS_CHARS} characters").into());
        return Err(error);
    }
    Ok(())
}

fn validate_period(request: &CreateBookingRequest) -> Result<(), ValidationError> {
    if request.start >= request.end {
        let mut error = ValidationError::new("period");
        error.message = Some("start must be before end".into());
        return Err(error);
    }
    Ok(())
}

impl From<CreateBookingRequest> for CreateBooking {
    fn from(request: CreateBookingRequest) -> Self {
        CreateBooking {
            boat_id: request.boat_id,
            start: request.start,
            end: request.end,
            guest_count: request.guest_count,
            special_requests: request.special_requests,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: BookingStatus,
}

/// Which of the caller's roles a listing covers
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListScopeParam {
    AsRenter,
    AsHost,
    #[default]
    All,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListBookingsParams {
    #[serde(default)]
    pub scope: ListScopeParam,
    pub status: Option<BookingStatus>,
    pub boat_id: Option<BoatId>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListBookingsParams> for ListBookings {
    fn from(params: ListBookingsParams) -> Self {
        ListBookings {
            scope: match params.scope {
                ListScopeParam::AsRenter => ListScope::AsRenter,
                ListScopeParam::AsHost => ListScope::AsHost,
                ListScopeParam::All => ListScope::All,
            },
            status: params.status,
            boat_id: params.boat_id,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: BookingId,
    pub boat_id: BoatId,
    pub renter_id: UserId,
    pub host_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub guest_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub base_price: Decimal,
    pub service_fee: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            boat_id: booking.boat_id,
            renter_id: booking.renter_id,
            host_id: booking.host_id,
            start: booking.period.start(),
            end: booking.period.end(),
            guest_count: booking.guest_count,
            special_requests: booking.special_requests,
            base_price: booking.price.base.amount(),
            service_fee: booking.price.service_fee.amount(),
            total_price: booking.price.total.amount(),
            currency: booking.price.total.currency().code().to_string(),
            status: booking.status,
            payment_status: booking.payment_status,
            payment_intent_id: booking.payment_intent_id,
            cancelled_by: booking.cancelled_by,
            cancelled_at: booking.cancelled_at,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBookingResponse {
    pub booking: BookingResponse,
    /// Secret the client uses to confirm the payment with the processor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<CreatedBooking> for CreateBookingResponse {
    fn from(created: CreatedBooking) -> Self {
        Self {
            booking: created.booking.into(),
            client_secret: created.client_secret,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub count: usize,
}

impl From<Vec<Booking>> for BookingListResponse {
    fn from(bookings: Vec<Booking>) -> Self {
        let bookings: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
        Self {
            count: bookings.len(),
            bookings,
        }
    }
}

/// Result of a manual payment reconciliation that did not fail
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmPaymentResponse {
    /// `paid`, `failed` or `in_progress`
    pub outcome: String,
    pub intent_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingResponse>,
}

impl ConfirmPaymentResponse {
    /// Converts an outcome; `Err` carries the intent status of an incomplete payment
    pub fn try_from_outcome(outcome: ReconcileOutcome) -> Result<Self, IntentStatus> {
        match outcome {
            ReconcileOutcome::Paid(booking) => Ok(Self {
                outcome: "paid".to_string(),
                intent_status: Some(IntentStatus::Succeeded.to_string()),
                booking: Some(booking.into()),
            }),
            ReconcileOutcome::Failed(booking) => Ok(Self {
                outcome: "failed".to_string(),
                intent_status: Some(IntentStatus::PaymentFailed.to_string()),
                booking: Some(booking.into()),
            }),
            ReconcileOutcome::InProgress(status) => Ok(Self {
                outcome: "in_progress".to_string(),
                intent_status: Some(status.to_string()),
                booking: None,
            }),
            ReconcileOutcome::Incomplete(status) => Err(status),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// `applied`, `unchanged`, `unknown_intent` or `ignored`
    pub outcome: String,
}
