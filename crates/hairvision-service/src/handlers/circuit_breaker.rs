//! Operator endpoints for the image API circuit breaker.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use hairvision_core::CircuitBreakerStatus;

use crate::state::AppState;

/// Get the breaker's current status.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<CircuitBreakerStatus> {
    Json(state.breaker.status())
}

/// Close the breaker and clear recorded failures.
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<CircuitBreakerStatus> {
    let before = state.breaker.status();
    state.breaker.reset();

    tracing::warn!(
        was_open = before.is_open,
        failure_count = before.failure_count,
        "Circuit breaker reset by operator"
    );

    Json(state.breaker.status())
}
