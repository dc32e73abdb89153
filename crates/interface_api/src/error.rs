//! API error handling
//!
//! Domain errors map onto status codes uniformly. Gateway and storage failures
//! are logged with their source here and reach the client only as a generic
//! message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_booking::BookingError;
use domain_payment::WebhookError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Vec<String>>,
    },

    /// Payment processor failure; `code` distinguishes refunds
    #[error("Payment error: {code}")]
    Payment { code: &'static str },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidTransition(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_transition", msg, None)
            }
            ApiError::Validation { message, details } => {
                (StatusCode::BAD_REQUEST, "validation_error", message, details)
            }
            ApiError::Payment { code } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "The payment processor could not complete the request".to_string(),
                None,
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => ApiError::validation(msg),
            BookingError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} not found: {id}"))
            }
            BookingError::Forbidden(msg) => ApiError::Forbidden(msg),
            BookingError::Conflict(msg) => ApiError::Conflict(msg),
            BookingError::InvalidTransition(msg) => ApiError::InvalidTransition(msg),
            BookingError::PaymentGateway(source) => {
                error!(error = %source, "Payment gateway call failed");
                ApiError::Payment {
                    code: "payment_gateway_error",
                }
            }
            BookingError::RefundFailed(source) => {
                error!(error = %source, "Refund failed");
                ApiError::Payment {
                    code: "refund_failed",
                }
            }
            BookingError::Storage(source) => {
                error!(error = %source, "Storage operation failed");
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthorized
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSecret => {
                error!("Webhook secret is unusable");
                ApiError::Internal
            }
            WebhookError::InvalidPayload(msg) => {
                ApiError::BadRequest(format!("Invalid webhook payload: {msg}"))
            }
            _ => ApiError::BadRequest("Invalid webhook signature".to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_booking_error_status_codes() {
        assert_eq!(status_of(BookingError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BookingError::invalid_transition("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BookingError::forbidden("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(BookingError::not_found("Booking", "b")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(BookingError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(BookingError::Storage(PortError::internal("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(BookingError::PaymentGateway(PortError::internal("down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_webhook_errors_are_bad_requests() {
        assert_eq!(status_of(WebhookError::SignatureMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(WebhookError::NoSignatures), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
    }
}
