//! Payment Domain - Gateway Port and Webhook Verification
//!
//! The booking core never moves money itself. It talks to an external payment
//! processor through the [`PaymentGateway`] port:
//!
//! - **Payment intents**: created for a booking's total (in minor units) and
//!   later retrieved to reconcile status
//! - **Refunds**: issued when a paid booking is cancelled
//! - **Webhooks**: the processor notifies payment outcomes asynchronously;
//!   payloads are trusted only after [`WebhookVerifier`] checks their
//!   HMAC-SHA256 signature
//!
//! # Adapters
//!
//! - [`adapters::RestPaymentGateway`]: Stripe-compatible REST API over `reqwest`
//! - `ports::mock::MockPaymentGateway`: in-memory gateway (feature `mock`)
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_payment::{PaymentGateway, CreateIntentRequest};
//!
//! let intent = gateway.create_intent(CreateIntentRequest::new(44_000, Currency::USD)).await?;
//! println!("client secret: {:?}", intent.client_secret);
//! ```

pub mod intent;
pub mod ports;
pub mod webhook;
pub mod adapters;

pub use intent::{PaymentIntent, IntentStatus, CreateIntentRequest, Refund};
pub use ports::PaymentGateway;
pub use webhook::{WebhookVerifier, WebhookError, PaymentEvent, PaymentEventKind, SIGNATURE_HEADER};
