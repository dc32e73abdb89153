//! Payment processor webhooks

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::warn;

use domain_booking::WebhookOutcome;
use domain_payment::SIGNATURE_HEADER;

use crate::dto::booking::WebhookAck;
use crate::{error::ApiError, AppState};

/// Receives a signed payment event
///
/// The raw body is verified before it is parsed. Events for unknown intents
/// are acknowledged so the processor stops redelivering them.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("Webhook delivered without a signature header");
        return Err(ApiError::BadRequest(format!(
            "Missing {SIGNATURE_HEADER} header"
        )));
    };

    let event = state
        .webhooks
        .verify_and_parse(&body, signature, state.clock.now())
        .map_err(|e| {
            warn!(error = %e, "Webhook rejected");
            ApiError::from(e)
        })?;

    let outcome = match state.service.on_payment_webhook(&event).await? {
        WebhookOutcome::Applied(_) => "applied",
        WebhookOutcome::Unchanged(_) => "unchanged",
        WebhookOutcome::UnknownIntent(_) => "unknown_intent",
        WebhookOutcome::Ignored(_) => "ignored",
    };

    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.to_string(),
    }))
}
