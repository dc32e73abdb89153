//! REST Payment Gateway Adapter
//!
//! Talks to a Stripe-compatible payment API over HTTPS. Requests are
//! form-encoded and authenticated with a bearer secret key.
//!
//! # Error Handling
//!
//! Gateway responses are mapped to `PortError` variants:
//! - 400/402 -> `PortError::Validation` (invalid request, card declined)
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 409 -> `PortError::Conflict` (idempotency key reuse)
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Connect failures -> `PortError::Connection`

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};

use crate::intent::{CreateIntentRequest, PaymentIntent, Refund};
use crate::ports::PaymentGateway;

const ADAPTER_ID: &str = "rest-payment-gateway";

/// Circuit breaker thresholds
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Seconds before a half-open probe is allowed
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 30,
        }
    }
}

/// Configuration for the REST gateway adapter
#[derive(Debug, Clone)]
pub struct RestGatewayConfig {
    /// Base URL of the payment API (e.g. "https://api.stripe.com")
    pub base_url: String,
    /// Secret API key
    pub secret_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for RestGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stripe.com".to_string(),
            secret_key: String::new(),
            timeout_secs: 15,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

#[derive(Debug)]
struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU64,
    is_open: AtomicBool,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            opened_at: RwLock::new(None),
        }
    }

    async fn is_available(&self) -> bool {
        if !self.is_open.load(Ordering::Relaxed) {
            return true;
        }
        match *self.opened_at.read().await {
            Some(at) => at.elapsed() > Duration::from_secs(self.config.reset_timeout_secs),
            None => true,
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        self.is_open.store(false, Ordering::Relaxed);
    }

    async fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= u64::from(self.config.failure_threshold) {
            self.is_open.store(true, Ordering::Relaxed);
            *self.opened_at.write().await = Some(Instant::now());
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: GatewayErrorBody,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

/// Stripe-compatible payment gateway
#[derive(Debug)]
pub struct RestPaymentGateway {
    config: RestGatewayConfig,
    client: reqwest::Client,
    circuit_breaker: Option<CircuitBreaker>,
}

impl RestPaymentGateway {
    /// Builds the adapter and its HTTP client
    pub fn new(config: RestGatewayConfig) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortError::Internal {
                message: "Failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        let circuit_breaker = config.circuit_breaker.clone().map(CircuitBreaker::new);

        Ok(Self {
            config,
            client,
            circuit_breaker,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn guard(&self) -> Result<(), PortError> {
        if let Some(cb) = &self.circuit_breaker {
            if !cb.is_available().await {
                return Err(PortError::ServiceUnavailable {
                    service: "payment gateway (circuit open)".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn record(&self, result: &Result<reqwest::Response, PortError>) {
        let Some(cb) = &self.circuit_breaker else {
            return;
        };
        match result {
            Ok(resp) if !resp.status().is_server_error() => cb.record_success(),
            Err(e) if !e.is_transient() => cb.record_success(),
            _ => cb.record_failure().await,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PortError> {
        self.guard().await?;

        let result = request
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| self.map_transport_error(operation, e));
        self.record(&result).await;
        let response = result?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| PortError::Transformation {
                message: format!("{operation}: unexpected response body: {e}"),
            });
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status.as_u16(), &body, retry_after))
    }

    fn map_transport_error(&self, operation: &str, error: reqwest::Error) -> PortError {
        warn!(operation, error = %error, "Payment gateway request failed");
        if error.is_timeout() {
            PortError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.config.timeout_secs * 1000,
            }
        } else if error.is_connect() {
            PortError::Connection {
                message: format!("{operation}: cannot reach payment gateway"),
                source: Some(Box::new(error)),
            }
        } else {
            PortError::Internal {
                message: format!("{operation}: payment gateway request failed"),
                source: Some(Box::new(error)),
            }
        }
    }
}

/// Maps a non-success gateway response to a port error
pub fn map_status(status: u16, body: &str, retry_after: Option<u64>) -> PortError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
        .unwrap_or_else(|| format!("payment gateway returned {status}"));
    let param = parsed.and_then(|e| e.param);

    match status {
        400 | 402 => PortError::Validation {
            message,
            field: param,
        },
        401 | 403 => PortError::Unauthorized { message },
        404 => PortError::NotFound {
            entity_type: "PaymentIntent".to_string(),
            id: param.unwrap_or_default(),
        },
        409 => PortError::Conflict { message },
        429 => PortError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(1),
        },
        500..=599 => PortError::ServiceUnavailable {
            service: format!("payment gateway ({status})"),
        },
        _ => PortError::internal(message),
    }
}

fn intent_form(request: &CreateIntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount_minor.to_string()),
        ("currency".to_string(), request.currency.code().to_lowercase()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

impl DomainPort for RestPaymentGateway {}

#[async_trait]
impl HealthCheckable for RestPaymentGateway {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        if let Err(e) = self.guard().await {
            return HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Degraded,
                latency_ms: 0,
                message: Some(e.to_string()),
                checked_at: Utc::now(),
            };
        }

        let result = self
            .send::<serde_json::Value>("health_check", self.client.get(self.url("v1/balance")))
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) if e.is_transient() => (AdapterHealth::Degraded, Some(e.to_string())),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };
        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RestPaymentGateway {
    #[instrument(skip(self, request), fields(amount = request.amount_minor, currency = %request.currency))]
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<PaymentIntent, PortError> {
        let mut builder = self
            .client
            .post(self.url("v1/payment_intents"))
            .form(&intent_form(&request));
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        let intent: PaymentIntent = self.send("create_intent", builder).await?;
        debug!(intent_id = %intent.id, "Payment intent created");
        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, PortError> {
        let builder = self
            .client
            .get(self.url(&format!("v1/payment_intents/{intent_id}")));
        self.send("retrieve_intent", builder).await.map_err(|e| match e {
            PortError::NotFound { entity_type, .. } => PortError::NotFound {
                entity_type,
                id: intent_id.to_string(),
            },
            other => other,
        })
    }

    #[instrument(skip(self))]
    async fn create_refund(
        &self,
        intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<Refund, PortError> {
        let mut form = vec![("payment_intent".to_string(), intent_id.to_string())];
        if let Some(amount) = amount_minor {
            form.push(("amount".to_string(), amount.to_string()));
        }
        let builder = self
            .client
            .post(self.url("v1/refunds"))
            .header("Idempotency-Key", format!("refund-{intent_id}"))
            .form(&form);
        let refund: Refund = self.send("create_refund", builder).await?;
        debug!(refund_id = %refund.id, "Refund issued");
        Ok(refund)
    }
}
