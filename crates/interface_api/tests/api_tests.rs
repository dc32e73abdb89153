//! HTTP API tests over the in-memory harness

use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{Clock, UserId};
use domain_booking::{BookingStatus, PaymentStatus};
use domain_payment::{IntentStatus, WebhookVerifier, SIGNATURE_HEADER};
use interface_api::auth::{create_token, ADMIN_ROLE};
use interface_api::config::ApiConfig;
use interface_api::dto::{
    BookingListResponse, BookingResponse, ConfirmPaymentResponse, CreateBookingResponse, WebhookAck,
};
use interface_api::{create_router, AppState};
use test_utils::{InMemoryHarness, TemporalFixtures};

const WEBHOOK_SECRET: &str = "whsec_api_tests";

struct TestApp {
    server: TestServer,
    harness: InMemoryHarness,
    config: ApiConfig,
}

impl TestApp {
    async fn new() -> Self {
        let harness = InMemoryHarness::new().await;
        let config = ApiConfig {
            webhook_secret: WEBHOOK_SECRET.to_string(),
            jwt_secret: "api-test-secret".to_string(),
            system_user_id: harness.actors.system.into(),
            admin_user_id: harness.actors.admin.into(),
            ..ApiConfig::default()
        };
        let state = AppState::new(harness.service.clone(), harness.clock.clone(), config.clone());
        let server = TestServer::new(create_router(state)).unwrap();
        Self {
            server,
            harness,
            config,
        }
    }

    fn token(&self, user: UserId) -> String {
        create_token(&user, vec![], &self.config.jwt_secret, 3600).unwrap()
    }

    fn admin_token(&self, user: UserId) -> String {
        create_token(&user, vec![ADMIN_ROLE.to_string()], &self.config.jwt_secret, 3600).unwrap()
    }

    fn booking_body(&self, hours: i64) -> Value {
        let period = TemporalFixtures::hours(hours);
        json!({
            "boat_id": self.harness.boat.id,
            "start": period.start(),
            "end": period.end(),
            "guest_count": 2,
            "special_requests": "Life jackets for kids",
        })
    }

    async fn create_booking(&self) -> CreateBookingResponse {
        let response = self
            .server
            .post("/api/v1/bookings")
            .authorization_bearer(self.token(self.harness.renter))
            .json(&self.booking_body(4))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<CreateBookingResponse>()
    }

    async fn deliver_webhook(&self, payload: Value, secret: &str) -> axum_test::TestResponse {
        let body = serde_json::to_vec(&payload).unwrap();
        let timestamp = self.harness.clock.now().timestamp();
        let signature = WebhookVerifier::new(secret).sign(&body, timestamp).unwrap();
        self.server
            .post("/api/v1/webhooks/payments")
            .add_header(
                HeaderName::from_static(SIGNATURE_HEADER),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(Bytes::from(body))
            .await
    }
}

fn intent_event(kind: &str, intent_id: &str, status: &str) -> Value {
    json!({
        "id": format!("evt_{kind}_{intent_id}"),
        "type": format!("payment_intent.{kind}"),
        "data": { "object": { "id": intent_id, "object": "payment_intent", "status": status } }
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");

    let response = app.server.get("/api/v1/health/ready").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["adapters"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_bookings_require_a_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/v1/bookings")
        .json(&app.booking_body(4))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/v1/bookings")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_booking_prices_and_returns_client_secret() {
    let app = TestApp::new().await;

    let created = app.create_booking().await;

    assert_eq!(created.booking.renter_id, app.harness.renter);
    assert_eq!(created.booking.host_id, app.harness.host);
    assert_eq!(created.booking.base_price, dec!(400));
    assert_eq!(created.booking.service_fee, dec!(40));
    assert_eq!(created.booking.total_price, dec!(440));
    assert_eq!(created.booking.currency, "USD");
    assert_eq!(created.booking.status, BookingStatus::Pending);
    assert_eq!(created.booking.payment_status, PaymentStatus::Pending);
    assert!(created.client_secret.is_some());
    assert!(created.booking.payment_intent_id.is_some());
}

#[tokio::test]
async fn test_create_booking_validation_errors() {
    let app = TestApp::new().await;
    let token = app.token(app.harness.renter);

    let mut body = app.booking_body(4);
    body["guest_count"] = json!(0);
    let response = app
        .server
        .post("/api/v1/bookings")
        .authorization_bearer(&token)
        .json(&body)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "validation_error");

    let mut body = app.booking_body(4);
    body["guest_count"] = json!(7);
    let response = app
        .server
        .post("/api/v1/bookings")
        .authorization_bearer(&token)
        .json(&body)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/bookings")
        .authorization_bearer(&token)
        .json(&json!({ "boat_id": "nope" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlapping_booking_conflicts() {
    let app = TestApp::new().await;
    app.create_booking().await;

    let response = app
        .server
        .post("/api/v1/bookings")
        .authorization_bearer(app.token(UserId::new()))
        .json(&app.booking_body(2))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "conflict");
}

#[tokio::test]
async fn test_get_booking_visibility() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let path = format!("/api/v1/bookings/{}", created.booking.id);

    app.server
        .get(&path)
        .authorization_bearer(app.token(app.harness.host))
        .await
        .assert_status_ok();

    app.server
        .get(&path)
        .authorization_bearer(app.token(UserId::new()))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .get(&path)
        .authorization_bearer(app.admin_token(UserId::new()))
        .await
        .assert_status_ok();

    app.server
        .get(&format!("/api/v1/bookings/{}", uuid::Uuid::new_v4()))
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .get("/api/v1/bookings/not-an-id")
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_bookings_by_scope() {
    let app = TestApp::new().await;
    app.create_booking().await;

    let as_renter = app
        .server
        .get("/api/v1/bookings")
        .add_query_param("scope", "as_renter")
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .json::<BookingListResponse>();
    assert_eq!(as_renter.count, 1);

    let as_host_from_renter = app
        .server
        .get("/api/v1/bookings")
        .add_query_param("scope", "as_host")
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .json::<BookingListResponse>();
    assert_eq!(as_host_from_renter.count, 0);

    let as_host = app
        .server
        .get("/api/v1/bookings")
        .add_query_param("scope", "as_host")
        .add_query_param("status", "pending")
        .authorization_bearer(app.token(app.harness.host))
        .await
        .json::<BookingListResponse>();
    assert_eq!(as_host.count, 1);

    app.server
        .get("/api/v1/bookings")
        .add_query_param("limit", "0")
        .authorization_bearer(app.token(app.harness.host))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_host_cannot_confirm_before_payment() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;

    let response = app
        .server
        .patch(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.host))
        .json(&json!({ "status": "confirmed" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_transition");
}

#[tokio::test]
async fn test_renter_cancels_pending_booking() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;

    let response = app
        .server
        .patch(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .json(&json!({ "status": "cancelled" }))
        .await;
    response.assert_status_ok();
    let booking = response.json::<BookingResponse>();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.cancelled_by, Some(app.harness.renter));

    let response = app
        .server
        .patch(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(UserId::new()))
        .json(&json!({ "status": "cancelled" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_confirm_payment_outcomes() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let intent_id = created.booking.payment_intent_id.clone().unwrap();
    let path = format!("/api/v1/bookings/{}/confirm-payment", created.booking.id);
    let token = app.token(app.harness.renter);

    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    app.harness.gateway.set_status(&intent_id, IntentStatus::Processing).await;
    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status_ok();
    let body = response.json::<ConfirmPaymentResponse>();
    assert_eq!(body.outcome, "in_progress");
    assert!(body.booking.is_none());

    app.harness.gateway.set_status(&intent_id, IntentStatus::Succeeded).await;
    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status_ok();
    let body = response.json::<ConfirmPaymentResponse>();
    assert_eq!(body.outcome, "paid");
    let booking = body.booking.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);

    app.server
        .post(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_paid_booking_refunds() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let intent_id = created.booking.payment_intent_id.clone().unwrap();
    app.harness.gateway.set_status(&intent_id, IntentStatus::Succeeded).await;
    app.server
        .post(&format!("/api/v1/bookings/{}/confirm-payment", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .assert_status_ok();

    let response = app
        .server
        .patch(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.host))
        .json(&json!({ "status": "cancelled" }))
        .await;
    response.assert_status_ok();
    let booking = response.json::<BookingResponse>();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.payment_status, PaymentStatus::Refunded);
    assert_eq!(app.harness.gateway.refunds().await.len(), 1);
}

#[tokio::test]
async fn test_refund_failure_is_a_generic_server_error() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let intent_id = created.booking.payment_intent_id.clone().unwrap();
    app.harness.gateway.set_status(&intent_id, IntentStatus::Succeeded).await;
    app.server
        .post(&format!("/api/v1/bookings/{}/confirm-payment", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .assert_status_ok();

    app.harness.gateway.fail_next_refund();
    let response = app
        .server
        .patch(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .json(&json!({ "status": "cancelled" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "refund_failed");
    assert!(!body["message"].as_str().unwrap().contains("mock"));
}

#[tokio::test]
async fn test_signed_webhook_marks_booking_paid() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let intent_id = created.booking.payment_intent_id.clone().unwrap();

    let response = app
        .deliver_webhook(intent_event("succeeded", &intent_id, "succeeded"), WEBHOOK_SECRET)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<WebhookAck>().outcome, "applied");

    let response = app
        .deliver_webhook(intent_event("succeeded", &intent_id, "succeeded"), WEBHOOK_SECRET)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<WebhookAck>().outcome, "unchanged");

    let booking = app
        .server
        .get(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .json::<BookingResponse>();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_webhook_for_unknown_intent_is_acknowledged() {
    let app = TestApp::new().await;

    let response = app
        .deliver_webhook(intent_event("succeeded", "pi_unknown", "succeeded"), WEBHOOK_SECRET)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<WebhookAck>().outcome, "unknown_intent");

    let other = json!({
        "id": "evt_charge",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1", "object": "charge" } }
    });
    let response = app.deliver_webhook(other, WEBHOOK_SECRET).await;
    response.assert_status_ok();
    assert_eq!(response.json::<WebhookAck>().outcome, "ignored");
}

#[tokio::test]
async fn test_webhook_signature_rejections() {
    let app = TestApp::new().await;
    let created = app.create_booking().await;
    let intent_id = created.booking.payment_intent_id.clone().unwrap();

    let response = app
        .deliver_webhook(intent_event("succeeded", &intent_id, "succeeded"), "whsec_wrong")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/webhooks/payments")
        .json(&intent_event("succeeded", &intent_id, "succeeded"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let booking = app
        .server
        .get(&format!("/api/v1/bookings/{}", created.booking.id))
        .authorization_bearer(app.token(app.harness.renter))
        .await
        .json::<BookingResponse>();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
}
