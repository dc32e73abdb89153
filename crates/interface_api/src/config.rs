//! API configuration
//!
//! Loaded from `API_`-prefixed environment variables (a `.env` file is read
//! first by the server binary). Unset fields fall back to [`ApiConfig::default`].

use serde::Deserialize;
use uuid::Uuid;

use core_kernel::UserId;
use domain_booking::SystemActors;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Payment processor API base URL
    pub payment_api_base_url: String,
    /// Payment processor secret key
    pub payment_api_key: String,
    /// Shared secret for webhook signatures
    pub webhook_secret: String,
    /// Accepted skew between a webhook's signed timestamp and now
    pub webhook_tolerance_secs: i64,
    /// Well-known id recorded on webhook-driven changes
    pub system_user_id: Uuid,
    /// Well-known operator id that may view every booking
    pub admin_user_id: Uuid,
    /// Per-request timeout for payment processor calls
    pub gateway_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/boat_charter".to_string(),
            log_level: "info".to_string(),
            payment_api_base_url: "https://api.stripe.com".to_string(),
            payment_api_key: String::new(),
            webhook_secret: String::new(),
            webhook_tolerance_secs: 300,
            system_user_id: Uuid::from_u128(1),
            admin_user_id: Uuid::from_u128(2),
            gateway_timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured system and admin actors
    pub fn system_actors(&self) -> SystemActors {
        SystemActors::new(
            UserId::from_uuid(self.system_user_id),
            UserId::from_uuid(self.admin_user_id),
        )
    }

    /// Rejects settings the server cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.webhook_secret.is_empty() {
            return Err(config::ConfigError::Message(
                "webhook_secret must be set".to_string(),
            ));
        }
        if self.webhook_tolerance_secs <= 0 {
            return Err(config::ConfigError::Message(
                "webhook_tolerance_secs must be positive".to_string(),
            ));
        }
        if self.system_user_id == self.admin_user_id {
            return Err(config::ConfigError::Message(
                "system_user_id and admin_user_id must differ".to_string(),
            ));
        }
        if self.gateway_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "gateway_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_a_webhook_secret() {
        let config = ApiConfig::default();
        assert!(config.validate().is_err());

        let config = ApiConfig {
            webhook_secret: "whsec_test".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_shared_actor_ids_rejected() {
        let config = ApiConfig {
            webhook_secret: "whsec_test".to_string(),
            admin_user_id: Uuid::from_u128(1),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_system_actors_from_config() {
        let config = ApiConfig::default();
        let actors = config.system_actors();
        assert_eq!(Uuid::from(actors.system), config.system_user_id);
        assert_eq!(Uuid::from(actors.admin), config.admin_user_id);
    }
}
