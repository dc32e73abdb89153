//! Payment intent and refund records as reported by the gateway

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use core_kernel::Currency;

/// Status of a payment intent on the gateway side
///
/// The booking core only observes this state machine; it never drives it
/// except by creating intents and refunding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    PaymentFailed,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// The customer still has to act before the charge can complete
    pub fn awaits_customer(&self) -> bool {
        matches!(
            self,
            IntentStatus::RequiresPaymentMethod | IntentStatus::RequiresConfirmation
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::PaymentFailed => "payment_failed",
            IntentStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment intent as returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque gateway identifier (e.g. `pi_...`)
    pub id: String,
    /// Secret the client uses to confirm the payment
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Amount in minor currency units
    pub amount: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    /// Current status
    pub status: IntentStatus,
    /// Reconciliation metadata attached at creation
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Parameters for creating a payment intent
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIntentRequest {
    /// Amount in minor currency units
    pub amount_minor: i64,
    /// Charge currency
    pub currency: Currency,
    /// Metadata stored on the intent for audit and reconciliation
    pub metadata: BTreeMap<String, String>,
    /// Key that makes retried creation calls return the same intent
    pub idempotency_key: Option<String>,
}

impl CreateIntentRequest {
    /// Creates a request without metadata
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
            metadata: BTreeMap::new(),
            idempotency_key: None,
        }
    }

    /// Adds a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the idempotency key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A refund issued against a payment intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    /// Opaque gateway identifier (e.g. `re_...`)
    pub id: String,
    /// The refunded payment intent
    pub payment_intent: String,
    /// Refunded amount in minor units
    pub amount: i64,
    /// Gateway-reported refund status (`succeeded`, `pending`, ...)
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_deserializes() {
        let status: IntentStatus = serde_json::from_str("\"some_new_state\"").unwrap();
        assert_eq!(status, IntentStatus::Unknown);
    }

    #[test]
    fn test_awaits_customer() {
        assert!(IntentStatus::RequiresPaymentMethod.awaits_customer());
        assert!(IntentStatus::RequiresConfirmation.awaits_customer());
        assert!(!IntentStatus::Processing.awaits_customer());
        assert!(!IntentStatus::Succeeded.awaits_customer());
    }

    #[test]
    fn test_intent_parses_gateway_json() {
        let json = r#"{
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 44000,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc",
            "metadata": {"boat_id": "b1"}
        }"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.amount, 44_000);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.metadata.get("boat_id").map(String::as_str), Some("b1"));
    }
}
