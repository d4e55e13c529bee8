//! Application state.

use std::sync::Arc;

use hairvision_core::CircuitBreaker;
use hairvision_store::Store;

use crate::config::ServiceConfig;
use crate::gemini::{GeminiClient, ImageGenerator};
use crate::ledger::CreditLedger;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Credit ledger over `store`.
    pub ledger: Arc<CreditLedger>,

    /// Breaker guarding the image API.
    pub breaker: Arc<CircuitBreaker>,

    /// Image generator (optional, needs an API key).
    pub generator: Option<Arc<dyn ImageGenerator>>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        // Create Gemini client if configured
        let generator = config.gemini_api_key.as_ref().and_then(|key| {
            match GeminiClient::new(&config.gemini_api_url, key) {
                Ok(client) => {
                    tracing::info!(gemini_url = %config.gemini_api_url, "Gemini integration enabled");
                    Some(Arc::new(client) as Arc<dyn ImageGenerator>)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Gemini client");
                    None
                }
            }
        });

        if generator.is_none() {
            tracing::warn!("Gemini not configured - image generation will not be available");
        }

        Self::with_generator(store, config, generator)
    }

    /// Create application state with an explicit generator.
    #[must_use]
    pub fn with_generator(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        generator: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            ledger: Arc::new(CreditLedger::new(Arc::clone(&store))),
            breaker: Arc::new(CircuitBreaker::new(config.breaker)),
            store,
            generator,
            config,
        }
    }

    /// Check if image generation is configured.
    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }
}
