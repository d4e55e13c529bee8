//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use hairvision_core::CircuitState;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok" or "degraded").
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Whether the store answered a ping.
    pub store_ok: bool,
    /// State of the image API circuit breaker.
    pub circuit_breaker: CircuitState,
    /// Whether image generation is configured.
    pub generation_enabled: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if store_ok { "ok" } else { "degraded" }.to_string(),
        service: "hairvision".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_ok,
        circuit_breaker: state.breaker.status().state,
        generation_enabled: state.has_generator(),
    })
}
