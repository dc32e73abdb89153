//! HTTP API Layer
//!
//! This crate exposes the booking core over REST using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: bookings, payment webhooks, health
//! - **Middleware**: bearer JWT authentication, tracing, audit logging
//! - **DTOs**: request/response bodies, validated with `validator`
//! - **Error Handling**: every domain error maps to one status code
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(service, clock, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::Clock;
use domain_booking::BookingService;
use domain_payment::WebhookVerifier;

use crate::config::ApiConfig;
use crate::handlers::{bookings, health, webhooks};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    pub webhooks: Arc<WebhookVerifier>,
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
}

impl AppState {
    /// Builds the state, deriving the webhook verifier from `config`
    pub fn new(service: Arc<BookingService>, clock: Arc<dyn Clock>, config: ApiConfig) -> Self {
        let webhooks = WebhookVerifier::new(config.webhook_secret.clone())
            .with_tolerance(config.webhook_tolerance_secs);
        Self {
            service,
            webhooks: Arc::new(webhooks),
            clock,
            config,
        }
    }
}

/// Creates the main API router
///
/// Health and webhook routes are public; webhook deliveries authenticate
/// through their signature instead of a bearer token.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/webhooks/payments", post(webhooks::payment_webhook));

    let booking_routes = Router::new()
        .route(
            "/",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/:id",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route("/:id/confirm-payment", post(bookings::confirm_payment));

    let protected_routes = Router::new()
        .nest("/bookings", booking_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
