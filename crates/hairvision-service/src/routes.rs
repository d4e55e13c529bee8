//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{circuit_breaker, credits, generations, health, tiers};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check with breaker state
/// - `GET /v1/tiers` - Subscription tier table
///
/// ## Credits
/// - `GET /v1/salons/:salon_id/credits` - Balance and statistics
/// - `POST /v1/salons/:salon_id/credits/purchase` - Add purchased credits
/// - `POST /v1/salons/:salon_id/credits/usage` - Record usage
/// - `GET /v1/salons/:salon_id/credits/history` - Usage history
/// - `GET /v1/salons/:salon_id/credits/alerts` - Credit alerts
/// - `PUT /v1/salons/:salon_id/subscription` - Change tier
///
/// ## Generations (concurrency-limited)
/// - `POST /v1/salons/:salon_id/generations` - Guarded image generation
///
/// ## Admin
/// - `GET /v1/admin/circuit-breaker` - Breaker status
/// - `POST /v1/admin/circuit-breaker/reset` - Close the breaker
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let generation_max_concurrent = state.config.generation_max_concurrent.max(1);

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Each generation holds an upstream connection for seconds, so these
    // routes get their own, much smaller limit.
    let generation_routes = Router::new()
        .route(
            "/salons/:salon_id/generations",
            post(generations::create_generation),
        )
        .layer(ConcurrencyLimitLayer::new(generation_max_concurrent));

    let api_routes = Router::new()
        .route("/tiers", get(tiers::list_tiers))
        // Credits
        .route("/salons/:salon_id/credits", get(credits::get_credits))
        .route(
            "/salons/:salon_id/credits/purchase",
            post(credits::purchase_credits),
        )
        .route(
            "/salons/:salon_id/credits/usage",
            post(credits::record_usage),
        )
        .route(
            "/salons/:salon_id/credits/history",
            get(credits::list_history),
        )
        .route("/salons/:salon_id/credits/alerts", get(credits::get_alerts))
        .route(
            "/salons/:salon_id/subscription",
            put(credits::update_subscription),
        )
        // Admin
        .route("/admin/circuit-breaker", get(circuit_breaker::get_status))
        .route("/admin/circuit-breaker/reset", post(circuit_breaker::reset))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .merge(generation_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
