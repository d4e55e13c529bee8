//! HairVision Service - HTTP API for salon credits and image generation
//!
//! This is the main entry point for the hairvision service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hairvision_service::{create_router, AppState, ServiceConfig};
use hairvision_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hairvision=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HairVision Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        data_dir = ?config.data_dir,
        gemini_configured = %config.gemini_api_key.is_some(),
        allow_overage = %config.allow_overage,
        breaker_threshold = config.breaker.failure_threshold,
        breaker_window_secs = config.breaker.window.as_secs(),
        breaker_cooldown_secs = config.breaker.cooldown.as_secs(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the storage backend: PostgreSQL, then `RocksDB`, then memory.
async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL");
        let store = PgStore::connect(url).await?;
        store.migrate().await?;
        tracing::info!("PostgreSQL migrations applied");
        return Ok(Arc::new(store));
    }

    #[cfg(feature = "rocksdb-backend")]
    if let Some(dir) = &config.data_dir {
        tracing::info!(path = %dir, "Opening RocksDB store");
        return Ok(Arc::new(hairvision_store::RocksStore::open(dir)?));
    }

    #[cfg(not(feature = "rocksdb-backend"))]
    if config.data_dir.is_some() {
        tracing::warn!("DATA_DIR is set but the rocksdb-backend feature is disabled");
    }

    tracing::warn!("No persistent store configured - balances will be lost on restart");
    Ok(Arc::new(MemoryStore::new()))
}
