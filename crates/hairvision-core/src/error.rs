//! Error types for HairVision core types.

use crate::ids::IdError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The subscription tier is not one of the enumerated tiers.
    #[error("unknown subscription tier: {0}")]
    UnknownTier(String),

    /// The image resolution is not supported.
    #[error("unknown resolution: {0}")]
    UnknownResolution(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Invalid credit amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
