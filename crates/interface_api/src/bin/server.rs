//! Boat Charter Booking API - Server Binary
//!
//! # Usage
//!
//! ```bash
//! API_WEBHOOK_SECRET=whsec_... API_DATABASE_URL=postgres://... cargo run --bin charter-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_PAYMENT_API_BASE_URL` - Payment processor base URL
//! * `API_PAYMENT_API_KEY` - Payment processor secret key
//! * `API_WEBHOOK_SECRET` - Webhook signing secret (required)
//! * `API_WEBHOOK_TOLERANCE_SECS` - Accepted webhook timestamp skew (default: 300)
//! * `API_SYSTEM_USER_ID` / `API_ADMIN_USER_ID` - Well-known actor ids
//! * `API_GATEWAY_TIMEOUT_SECS` - Payment processor request timeout (default: 15)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{Clock, SystemClock};
use domain_booking::BookingService;
use domain_payment::adapters::{CircuitBreakerConfig, RestGatewayConfig, RestPaymentGateway};
use infra_db::{create_pool, ensure_system_actors, run_migrations, DatabaseConfig, PostgresBookingAdapter};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development reads a .env file when present
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_level);
    config.validate().context("validating configuration")?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting boat charter booking API"
    );

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let actors = config.system_actors();
    ensure_system_actors(&pool, &actors)
        .await
        .context("creating system actors")?;

    let storage = Arc::new(PostgresBookingAdapter::new(pool));
    let gateway = RestPaymentGateway::new(RestGatewayConfig {
        base_url: config.payment_api_base_url.clone(),
        secret_key: config.payment_api_key.clone(),
        timeout_secs: config.gateway_timeout_secs,
        circuit_breaker: Some(CircuitBreakerConfig::default()),
    })
    .context("building payment gateway client")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = BookingService::new(
        storage.clone(),
        storage,
        Arc::new(gateway),
        clock.clone(),
        actors,
    );

    let app = create_router(AppState::new(Arc::new(service), clock, config.clone()));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("parsing server address")?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
