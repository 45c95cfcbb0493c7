//! Health check endpoints.
//!
//! Provides endpoints for monitoring server health and readiness.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;
use tracing::warn;

use crate::models::ApiResponse;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Server status
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub media: &'static str,
}

/// Liveness probe - server is running
///
/// GET /api/v1/healthcheck
async fn liveness() -> ApiResponse<HealthResponse> {
    ApiResponse::ok(
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
        "Health check passed",
    )
}

/// Readiness probe - server can accept requests
///
/// GET /api/v1/healthcheck/ready
async fn readiness(State(state): State<AppState>) -> ApiResponse<ReadinessResponse> {
    let db_ok = match state.db.ping() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            false
        }
    };

    let body = ReadinessResponse {
        status: if db_ok { "ready" } else { "not_ready" },
        database: if db_ok { "connected" } else { "disconnected" },
        media: state.media.provider_name(),
    };

    if db_ok {
        ApiResponse::ok(body, "Service is ready")
    } else {
        ApiResponse::new(StatusCode::SERVICE_UNAVAILABLE, body, "Service is not ready")
    }
}

/// Create health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}
