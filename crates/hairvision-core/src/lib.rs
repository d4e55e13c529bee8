//! Core types and utilities for HairVision credits.
//!
//! This crate provides the foundational types shared by the store and the
//! HTTP service:
//!
//! - **Identifiers**: `SalonId`, `UsageRecordId`
//! - **Tiers**: `SubscriptionTier` and its allotments and overage prices
//! - **Balances**: `CreditBalance`, `apply_rollover`
//! - **Stats**: `CreditStats`, `CreditAlert`
//! - **Usage**: `CreditUsageRecord`, `Resolution`
//! - **Pricing**: `GenerationPricing`
//! - **Circuit breaker**: `CircuitBreaker` guarding the image-generation API
//!
//! # Credit Unit
//!
//! One credit buys one 1k generation. Higher resolutions cost more credits.
//! Money amounts are stored as `i64` cents.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod balance;
pub mod breaker;
pub mod error;
pub mod ids;
pub mod pricing;
pub mod stats;
pub mod tier;
pub mod usage;

pub use balance::{add_billing_period, apply_rollover, CreditBalance};
pub use breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatus, CircuitState,
    DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD, DEFAULT_FAILURE_WINDOW,
};
pub use error::{CoreError, Result};
pub use ids::{IdError, SalonId, UsageRecordId, MAX_SALON_ID_LEN};
pub use pricing::{GenerationPricing, GenerationQuote, DEFAULT_IMAGE_MODEL};
pub use stats::{AlertKind, AlertSeverity, CreditAlert, CreditStats, LOW_CREDIT_THRESHOLD_PERCENT};
pub use tier::SubscriptionTier;
pub use usage::{CreditUsageRecord, Resolution};
