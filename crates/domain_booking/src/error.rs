//! Booking domain errors
//!
//! Every failure of the booking core is one of these kinds. The API layer maps
//! each kind to a status code; the source error of the gateway and storage
//! kinds is logged but never shown to clients.

use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

/// Errors that can occur in the booking domain
#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or unacceptable input; nothing was changed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The actor is authenticated but may not act on this booking
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request conflicts with current state (overlap, stale update, duplicate)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested lifecycle move is not allowed from the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The payment gateway failed; nothing was persisted
    #[error("Payment gateway error")]
    PaymentGateway(#[source] PortError),

    /// The refund was not issued; the booking is unchanged
    #[error("Refund failed")]
    RefundFailed(#[source] PortError),

    /// Persistence failed
    #[error("Storage error")]
    Storage(#[source] PortError),
}

impl BookingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        BookingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BookingError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BookingError::Conflict(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        BookingError::InvalidTransition(message.into())
    }

    /// Translates a persistence port error
    pub fn from_storage(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => BookingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => BookingError::Conflict(message),
            PortError::Validation { message, .. } => BookingError::Validation(message),
            other => BookingError::Storage(other),
        }
    }

    /// Short machine-readable kind, used in logs and API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation_error",
            BookingError::NotFound { .. } => "not_found",
            BookingError::Forbidden(_) => "forbidden",
            BookingError::Conflict(_) => "conflict",
            BookingError::InvalidTransition(_) => "invalid_transition",
            BookingError::PaymentGateway(_) => "payment_gateway_error",
            BookingError::RefundFailed(_) => "refund_failed",
            BookingError::Storage(_) => "storage_error",
        }
    }
}

impl From<TemporalError> for BookingError {
    fn from(error: TemporalError) -> Self {
        BookingError::Validation(error.to_string())
    }
}

impl From<MoneyError> for BookingError {
    fn from(error: MoneyError) -> Self {
        BookingError::Validation(error.to_string())
    }
}
