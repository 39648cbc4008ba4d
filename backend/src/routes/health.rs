//! Health check endpoints
//!
//! - /health - Basic health check
//! - /health/ready - Readiness probe (checks the user store)
//! - /health/live - Liveness probe

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chatmentor_shared::{Envelope, EnvelopeStatus};
use serde::Serialize;
use tracing::warn;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<HealthChecks>,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckStatus,
}

/// Status of an individual check
#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

type HealthJson = Json<Envelope<HealthResponse>>;

pub async fn health_check() -> HealthJson {
    Json(Envelope::success(
        HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: None,
        },
        "Service is healthy",
    ))
}

/// Readiness probe, 503 when the store cannot be reached
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<HealthJson, (StatusCode, HealthJson)> {
    let db_check = match state.users.ping().await {
        Ok(()) => CheckStatus {
            status: "healthy".to_string(),
            message: None,
        },
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            CheckStatus {
                status: "unhealthy".to_string(),
                message: Some("database unavailable".to_string()),
            }
        }
    };

    let is_healthy = db_check.status == "healthy";

    let response = HealthResponse {
        status: if is_healthy { "ready" } else { "not_ready" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(HealthChecks { database: db_check }),
    };

    if is_healthy {
        Ok(Json(Envelope::success(response, "Service is ready")))
    } else {
        let envelope = Envelope {
            status: EnvelopeStatus::Error,
            data: Some(response),
            message: Some("Service is not ready".to_string()),
            meta: None,
        };
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(envelope)))
    }
}

/// Liveness probe, OK while the process is serving
pub async fn liveness_check() -> HealthJson {
    Json(Envelope::success(
        HealthResponse {
            status: "alive".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: None,
        },
        "Service is alive",
    ))
}
