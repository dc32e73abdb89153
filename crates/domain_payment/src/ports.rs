//! Payment Gateway Port
//!
//! The `PaymentGateway` trait is the only way the booking core reaches the
//! payment processor. Adapters:
//!
//! - **REST adapter**: Stripe-compatible HTTP API (`adapters::RestPaymentGateway`)
//! - **Mock adapter**: in-memory intents and refunds for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_payment::ports::PaymentGateway;
//! use std::sync::Arc;
//!
//! pub struct BookingService {
//!     gateway: Arc<dyn PaymentGateway>,
//! }
//!
//! impl BookingService {
//!     async fn refund(&self, intent_id: &str) -> Result<Refund, PortError> {
//!         self.gateway.create_refund(intent_id, None).await
//!     }
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PortError};

use crate::intent::{CreateIntentRequest, PaymentIntent, Refund};

/// Port for the external payment processor
#[async_trait]
pub trait PaymentGateway: DomainPort + HealthCheckable {
    /// Creates a payment intent for the given amount
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<PaymentIntent, PortError>;

    /// Fetches the current state of an intent
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, PortError>;

    /// Refunds an intent; `amount_minor = None` refunds the full amount
    async fn create_refund(
        &self,
        intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<Refund, PortError>;
}

/// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    use crate::intent::IntentStatus;

    /// In-memory payment gateway
    ///
    /// Intents start in `requires_payment_method`. Tests drive them forward
    /// with [`MockPaymentGateway::set_status`] and can make the next call of
    /// a given kind fail.
    #[derive(Debug, Default)]
    pub struct MockPaymentGateway {
        intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
        refunds: Arc<RwLock<Vec<Refund>>>,
        sequence: AtomicU64,
        fail_next_create: AtomicBool,
        fail_next_retrieve: AtomicBool,
        fail_next_refund: AtomicBool,
    }

    impl MockPaymentGateway {
        /// Creates an empty gateway
        pub fn new() -> Self {
            Self::default()
        }

        fn next_id(&self, prefix: &str) -> String {
            let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{prefix}_mock_{n:06}")
        }

        /// Forces an intent into the given status
        pub async fn set_status(&self, intent_id: &str, status: IntentStatus) {
            if let Some(intent) = self.intents.write().await.get_mut(intent_id) {
                intent.status = status;
            }
        }

        /// Makes the next `create_intent` call fail with a connection error
        pub fn fail_next_create(&self) {
            self.fail_next_create.store(true, Ordering::SeqCst);
        }

        /// Makes the next `retrieve_intent` call fail with a connection error
        pub fn fail_next_retrieve(&self) {
            self.fail_next_retrieve.store(true, Ordering::SeqCst);
        }

        /// Makes the next `create_refund` call fail with a connection error
        pub fn fail_next_refund(&self) {
            self.fail_next_refund.store(true, Ordering::SeqCst);
        }

        /// Returns a stored intent
        pub async fn intent(&self, intent_id: &str) -> Option<PaymentIntent> {
            self.intents.read().await.get(intent_id).cloned()
        }

        /// Returns all intents created so far
        pub async fn intents(&self) -> Vec<PaymentIntent> {
            let mut all: Vec<_> = self.intents.read().await.values().cloned().collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            all
        }

        /// Returns all refunds issued so far
        pub async fn refunds(&self) -> Vec<Refund> {
            self.refunds.read().await.clone()
        }
    }

    impl DomainPort for MockPaymentGateway {}

    #[async_trait]
    impl HealthCheckable for MockPaymentGateway {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-payment-gateway")
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        async fn create_intent(
            &self,
            request: CreateIntentRequest,
        ) -> Result<PaymentIntent, PortError> {
            if self.fail_next_create.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("mock gateway unavailable"));
            }
            if request.amount_minor <= 0 {
                return Err(PortError::validation_field(
                    "Amount must be greater than zero",
                    "amount",
                ));
            }

            let mut intents = self.intents.write().await;
            if let Some(key) = &request.idempotency_key {
                let existing = intents
                    .values()
                    .find(|i| i.metadata.get("idempotency_key") == Some(key));
                if let Some(intent) = existing {
                    return Ok(intent.clone());
                }
            }

            let id = self.next_id("pi");
            let mut metadata = request.metadata;
            if let Some(key) = request.idempotency_key {
                metadata.insert("idempotency_key".to_string(), key);
            }
            let intent = PaymentIntent {
                client_secret: Some(format!("{id}_secret")),
                id: id.clone(),
                amount: request.amount_minor,
                currency: request.currency.code().to_lowercase(),
                status: IntentStatus::RequiresPaymentMethod,
                metadata,
            };
            intents.insert(id, intent.clone());
            Ok(intent)
        }

        async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, PortError> {
            if self.fail_next_retrieve.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("mock gateway unavailable"));
            }
            self.intents
                .read()
                .await
                .get(intent_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PaymentIntent", intent_id))
        }

        async fn create_refund(
            &self,
            intent_id: &str,
            amount_minor: Option<i64>,
        ) -> Result<Refund, PortError> {
            if self.fail_next_refund.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("mock gateway unavailable"));
            }
            let intent = self
                .intents
                .read()
                .await
                .get(intent_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PaymentIntent", intent_id))?;
            if intent.status != IntentStatus::Succeeded {
                return Err(PortError::validation(format!(
                    "Intent {intent_id} has not succeeded and cannot be refunded"
                )));
            }

            let refund = Refund {
                id: self.next_id("re"),
                payment_intent: intent_id.to_string(),
                amount: amount_minor.unwrap_or(intent.amount),
                status: "succeeded".to_string(),
            };
            self.refunds.write().await.push(refund.clone());
            Ok(refund)
        }
    }
}
