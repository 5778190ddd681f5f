//! Health check and info endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;
use tracing::warn;

use crate::response::{HealthResponse, InfoResponse};
use crate::state::AppState;

/// GET /health - Full health check. Pings the store on every call.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.service.ping().await {
        Ok(()) => health().store.set_healthy(),
        Err(e) => {
            warn!(error = %e, "Store ping failed");
            health().store.set_unhealthy(e.to_string());
        }
    }

    Json(HealthResponse {
        store_connected: health().store.is_healthy(),
        portal_connected: health().portal.is_healthy(),
        report: health().report(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /info
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
