//! Webhook signature verification and event parsing
//!
//! The processor signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`. The signed payload is
//! `"{t}.{raw body}"` and the MAC is HMAC-SHA256 keyed with the endpoint
//! secret. More than one `v1` entry appears while a secret is being rotated;
//! any matching entry is accepted.

use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::intent::IntentStatus;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default tolerance between the signed timestamp and the local clock
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Errors raised while verifying or parsing a webhook delivery
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Signature header is malformed: {0}")]
    MalformedHeader(String),

    #[error("Signature header carries no v1 signature")]
    NoSignatures,

    #[error("Signature timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    TimestampOutsideTolerance { timestamp: i64, tolerance_secs: i64 },

    #[error("No signature matches the payload")]
    SignatureMismatch,

    #[error("Webhook secret is unusable")]
    InvalidSecret,

    #[error("Webhook payload is invalid: {0}")]
    InvalidPayload(String),
}

/// Verifies webhook signatures against the configured endpoint secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[redacted]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the timestamp tolerance
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn compute(&self, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(to_hex(&mac.finalize().into_bytes()))
    }

    /// Produces a signature header value for `payload` at `timestamp`
    ///
    /// Used by local tooling and tests to craft deliveries the way the
    /// processor would.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, WebhookError> {
        let signature = self.compute(timestamp, payload)?;
        Ok(format!("t={timestamp},v1={signature}"))
    }

    /// Checks the signature header against the raw body
    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WebhookError> {
        let parsed = SignatureHeader::parse(header)?;

        // `t=` is unauthenticated at this point, so the skew must not overflow
        let skew = now
            .timestamp()
            .checked_sub(parsed.timestamp)
            .and_then(i64::checked_abs);
        if skew.map_or(true, |skew| skew > self.tolerance_secs) {
            return Err(WebhookError::TimestampOutsideTolerance {
                timestamp: parsed.timestamp,
                tolerance_secs: self.tolerance_secs,
            });
        }

        let expected = self.compute(parsed.timestamp, payload)?;
        let matched = parsed
            .signatures
            .iter()
            .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }

    /// Verifies the delivery and parses it into a [`PaymentEvent`]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentEvent, WebhookError> {
        self.verify(payload, header, now)?;
        PaymentEvent::from_slice(payload)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::MalformedHeader(part.to_string()))?;
            match key {
                "t" => {
                    let ts = value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader(format!("t={value}")))?;
                    timestamp = Some(ts);
                }
                "v1" => signatures.push(value.to_string()),
                // v0 and future schemes are ignored
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::MalformedHeader("missing t".to_string()))?;
        if signatures.is_empty() {
            return Err(WebhookError::NoSignatures);
        }
        Ok(Self { timestamp, signatures })
    }
}

/// Kind of a payment event relevant to bookings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// `payment_intent.succeeded`
    Succeeded,
    /// `payment_intent.payment_failed`
    PaymentFailed,
    /// `payment_intent.canceled`
    Canceled,
    /// Any other event type; acknowledged and ignored
    Other(String),
}

impl PaymentEventKind {
    fn from_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => PaymentEventKind::Succeeded,
            "payment_intent.payment_failed" => PaymentEventKind::PaymentFailed,
            "payment_intent.canceled" => PaymentEventKind::Canceled,
            other => PaymentEventKind::Other(other.to_string()),
        }
    }
}

/// A verified event from the payment processor
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    /// Gateway event id (e.g. `evt_...`)
    pub id: String,
    pub kind: PaymentEventKind,
    /// Id of the object the event refers to; the intent id for intent events
    pub object_id: String,
    /// Intent status carried by the event, when the object is an intent
    pub intent_status: Option<IntentStatus>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: RawEventObject,
}

#[derive(Deserialize)]
struct RawEventObject {
    id: String,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    status: Option<IntentStatus>,
}

impl PaymentEvent {
    /// Parses an event body without verifying it
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let is_intent = raw.data.object.object.as_deref() == Some("payment_intent")
            || raw.event_type.starts_with("payment_intent.");

        Ok(Self {
            id: raw.id,
            kind: PaymentEventKind::from_type(&raw.event_type),
            object_id: raw.data.object.id,
            intent_status: if is_intent { raw.data.object.status } else { None },
        })
    }

    /// Returns the intent id when this event is about a payment intent
    pub fn intent_id(&self) -> Option<&str> {
        match self.kind {
            PaymentEventKind::Other(_) => None,
            _ => Some(&self.object_id),
        }
    }
}
