//! Common test utilities for hairvision integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;

use hairvision_core::{CircuitBreaker, SalonId};
use hairvision_service::{create_router, AppState, ServiceConfig};
use hairvision_store::MemoryStore;

/// API key the harness hands to the Gemini client.
pub const TEST_GEMINI_KEY: &str = "test-gemini-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Backing store, for asserting on persisted state.
    pub store: Arc<MemoryStore>,
    /// The breaker the router was built with.
    pub breaker: Arc<CircuitBreaker>,
    /// A salon ID unique to this harness.
    pub salon_id: SalonId,
}

impl TestHarness {
    /// Create a harness with generation disabled.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness whose Gemini client points at `gemini_url`.
    pub fn with_gemini(gemini_url: &str) -> Self {
        let mut config = test_config();
        config.gemini_api_url = gemini_url.to_string();
        config.gemini_api_key = Some(TEST_GEMINI_KEY.to_string());
        Self::with_config(config)
    }

    /// Create a harness from an explicit configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config);
        let breaker = Arc::clone(&state.breaker);

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            breaker,
            salon_id: "salon-test-1".parse().expect("valid salon id"),
        }
    }

    /// Path under this harness's salon.
    pub fn salon_path(&self, suffix: &str) -> String {
        format!("/v1/salons/{}{suffix}", self.salon_id)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by every harness.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        cors_origins: vec!["*".into()],
        request_timeout_seconds: 30,
        ..ServiceConfig::default()
    }
}

/// A minimal valid generation request body.
pub fn generation_body(resolution: &str) -> serde_json::Value {
    json!({
        "prompt": "Long layered cut, warm caramel balayage",
        "image_base64": general_purpose::STANDARD.encode(b"client-photo"),
        "mime_type": "image/jpeg",
        "resolution": resolution,
    })
}

/// A Gemini `generateContent` response carrying one image.
pub fn gemini_image_response() -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "Here is the new look" },
                    {
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": general_purpose::STANDARD.encode(b"styled-photo"),
                        }
                    }
                ]
            },
            "finishReason": "STOP"
        }]
    })
}
