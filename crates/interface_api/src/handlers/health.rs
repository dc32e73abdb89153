//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use core_kernel::{AdapterHealth, HealthCheckResult};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub adapters: Vec<AdapterStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub adapter: String,
    pub status: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<HealthCheckResult> for AdapterStatus {
    fn from(result: HealthCheckResult) -> Self {
        let status = match result.status {
            AdapterHealth::Healthy => "healthy",
            AdapterHealth::Degraded => "degraded",
            AdapterHealth::Unhealthy => "unhealthy",
            AdapterHealth::Unknown => "unknown",
        };
        Self {
            adapter: result.adapter_id,
            status: status.to_string(),
            latency_ms: result.latency_ms,
            message: result.message,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check over storage and the payment processor
///
/// Degraded adapters still serve traffic; an unhealthy one makes the
/// instance unready.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let results = state.service.health().await;
    let ready = results
        .iter()
        .all(|r| !matches!(r.status, AdapterHealth::Unhealthy));

    let (code, status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            adapters: results.into_iter().map(Into::into).collect(),
        }),
    )
}
