//! HairVision HTTP API service.
//!
//! This crate provides the HTTP API for salon credits and AI hairstyle
//! generation:
//!
//! - Credit balances, purchases, subscription changes and usage history
//! - Credit alerts (low credits, depleted, overage)
//! - Image generation through Gemini, guarded by a circuit breaker
//! - Operator endpoints to inspect and reset the breaker
//!
//! The ledger gates billing and the breaker gates availability. The
//! generation handler consults both; they never call each other.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers without awaits still need to be async

pub mod config;
pub mod error;
pub mod gemini;
pub mod handlers;
pub mod ledger;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use gemini::{GeminiClient, GeneratedImage, GenerationRequest, ImageGenerator, UpstreamError};
pub use ledger::{CreditLedger, LedgerError, UsageReport};
pub use routes::create_router;
pub use state::AppState;
