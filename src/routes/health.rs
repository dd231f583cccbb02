//! Health check endpoint for container orchestration.
//!
//! Backs both the liveness and readiness probes of the Deployment. The service
//! has no dependencies to warm up, so "the process answers HTTP" is the whole
//! readiness story.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check handler.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
