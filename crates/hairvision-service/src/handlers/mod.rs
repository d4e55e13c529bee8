//! API handlers.

pub mod circuit_breaker;
pub mod credits;
pub mod generations;
pub mod health;
pub mod tiers;

use hairvision_core::SalonId;

use crate::error::ApiError;

/// Parse a salon ID taken from the request path.
pub(crate) fn parse_salon_id(raw: &str) -> Result<SalonId, ApiError> {
    raw.parse()
        .map_err(|e: hairvision_core::IdError| ApiError::InvalidArgument(e.to_string()))
}
