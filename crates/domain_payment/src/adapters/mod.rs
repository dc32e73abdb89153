//! Payment gateway adapters

pub mod rest;

pub use rest::{CircuitBreakerConfig, RestGatewayConfig, RestPaymentGateway};
