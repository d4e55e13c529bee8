//! Service configuration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use hairvision_core::{CircuitBreakerConfig, GenerationPricing, DEFAULT_IMAGE_MODEL};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL. Takes precedence over every other backend.
    pub database_url: Option<String>,

    /// Path to `RocksDB` data directory (only used with `rocksdb-backend`).
    pub data_dir: Option<String>,

    /// Gemini API base URL.
    pub gemini_api_url: String,

    /// Gemini API key. Generation is disabled without one.
    pub gemini_api_key: Option<String>,

    /// Model used when a generation request does not name one.
    pub gemini_default_model: String,

    /// Circuit breaker settings for the Gemini API.
    pub breaker: CircuitBreakerConfig,

    /// Whether generations may push a salon into overage.
    pub allow_overage: bool,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum in-flight generation requests.
    pub generation_max_concurrent: usize,

    /// Generation pricing.
    pub pricing: GenerationPricing,
}

/// Gemini secrets file structure.
#[derive(Debug, Deserialize)]
struct GeminiSecrets {
    api_key: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Try to load Gemini secrets from file first, then fall back to env vars
        let (gemini_api_url, gemini_api_key) = load_gemini_secrets();

        let breaker = CircuitBreakerConfig::default()
            .with_failure_threshold(env_or(
                "BREAKER_FAILURE_THRESHOLD",
                defaults.breaker.failure_threshold,
            ))
            .with_window(Duration::from_secs(env_or(
                "BREAKER_WINDOW_SECONDS",
                defaults.breaker.window.as_secs(),
            )))
            .with_cooldown(Duration::from_secs(env_or(
                "BREAKER_COOLDOWN_SECONDS",
                defaults.breaker.cooldown.as_secs(),
            )));

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: non_empty_var("DATABASE_URL"),
            data_dir: non_empty_var("DATA_DIR"),
            gemini_api_url: gemini_api_url.unwrap_or(defaults.gemini_api_url),
            gemini_api_key,
            gemini_default_model: std::env::var("GEMINI_DEFAULT_MODEL")
                .unwrap_or(defaults.gemini_default_model),
            breaker,
            allow_overage: std::env::var("ALLOW_OVERAGE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.allow_overage),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            generation_max_concurrent: env_or(
                "GENERATION_MAX_CONCURRENT",
                defaults.generation_max_concurrent,
            )
            .max(1),
            pricing: defaults.pricing,
        }
    }
}

/// Read and parse an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load Gemini secrets from file or environment.
fn load_gemini_secrets() -> (Option<String>, Option<String>) {
    // Try multiple paths for the secrets file
    let secret_paths = [
        ".secrets/gemini.json",
        "hairvision/.secrets/gemini.json",
        "../.secrets/gemini.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<GeminiSecrets>(path) {
            tracing::info!(path = %path, "Loaded Gemini secrets from file");
            return (
                secrets.api_url.or_else(|| std::env::var("GEMINI_API_URL").ok()),
                Some(secrets.api_key),
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Gemini secrets file not found, using environment variables");
    (
        std::env::var("GEMINI_API_URL").ok(),
        non_empty_var("GEMINI_API_KEY"),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            data_dir: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.into(),
            gemini_api_key: None,
            gemini_default_model: DEFAULT_IMAGE_MODEL.into(),
            breaker: CircuitBreakerConfig::default(),
            allow_overage: true,
            cors_origins: vec!["*".into()],
            max_body_bytes: 10 * 1024 * 1024, // 10MB, room for a base64 photo
            request_timeout_seconds: 60,
            generation_max_concurrent: 8,
            pricing: GenerationPricing::default(),
        }
    }
}
