//! Booking handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::BookingId;

use crate::auth::Claims;
use crate::dto::booking::*;
use crate::{error::ApiError, AppState};

fn parse_booking_id(raw: &str) -> Result<BookingId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid booking id: {raw}")))
}

/// Creates a booking for the authenticated renter
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), ApiError> {
    let actor = claims.actor()?;
    let Json(request) = payload?;
    request.validate()?;

    let created = state.service.create(actor.id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Lists bookings visible to the caller
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<ListBookingsParams>, QueryRejection>,
) -> Result<Json<BookingListResponse>, ApiError> {
    let actor = claims.actor()?;
    let Query(params) = params?;
    params.validate()?;

    let bookings = state.service.list(&actor, params.into()).await?;
    Ok(Json(bookings.into()))
}

/// Gets a booking by ID
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let actor = claims.actor()?;
    let booking_id = parse_booking_id(&id)?;

    let booking = state.service.get(booking_id, &actor).await?;
    Ok(Json(booking.into()))
}

/// Moves a booking to the requested status
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let actor = claims.actor()?;
    let booking_id = parse_booking_id(&id)?;
    let Json(request) = payload?;

    let booking = state
        .service
        .transition(booking_id, actor.id, request.status)
        .await?;
    Ok(Json(booking.into()))
}

/// Reconciles a booking's payment with the processor on the renter's request
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let actor = claims.actor()?;
    let booking_id = parse_booking_id(&id)?;

    let outcome = state.service.reconcile_payment(booking_id, actor.id).await?;
    ConfirmPaymentResponse::try_from_outcome(outcome)
        .map(Json)
        .map_err(|status| ApiError::BadRequest(format!("Payment not completed: {status}")))
}
