//! Credit usage history.
//!
//! Every successful generation appends one [`CreditUsageRecord`]. Records are
//! immutable once written.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::{SalonId, UsageRecordId};

/// An append-only record of credits consumed by one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUsageRecord {
    /// Unique record ID (ULID for time-ordering).
    pub id: UsageRecordId,

    /// The salon that was charged.
    pub salon_id: SalonId,

    /// Credits consumed.
    pub credits_used: i64,

    /// Image model that served the generation (e.g. "gemini-2.5-flash-image").
    pub model: String,

    /// Output resolution.
    pub resolution: Resolution,

    /// Upstream cost of the generation in cents.
    pub cost_cents: i64,

    /// When the usage occurred.
    pub timestamp: DateTime<Utc>,
}

impl CreditUsageRecord {
    /// Create a new usage record stamped at `timestamp`.
    #[must_use]
    pub fn new(
        salon_id: SalonId,
        credits_used: i64,
        model: String,
        resolution: Resolution,
        cost_cents: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageRecordId::generate(),
            salon_id,
            credits_used,
            model,
            resolution,
            cost_cents,
            timestamp,
        }
    }
}

/// Output resolution of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Roughly 1024px on the long edge.
    #[default]
    #[serde(rename = "1k")]
    Standard,

    /// Roughly 2048px on the long edge.
    #[serde(rename = "2k")]
    High,

    /// Roughly 4096px on the long edge.
    #[serde(rename = "4k")]
    Ultra,
}

impl Resolution {
    /// Credits charged for one generation at this resolution.
    #[must_use]
    pub const fn credits(&self) -> i64 {
        match self {
            Self::Standard => 1,
            Self::High => 2,
            Self::Ultra => 4,
        }
    }

    /// Get the resolution label as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "1k",
            Self::High => "2k",
            Self::Ultra => "4k",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1k" => Ok(Self::Standard),
            "2k" => Ok(Self::High),
            "4k" => Ok(Self::Ultra),
            _ => Err(CoreError::UnknownResolution(s.to_string())),
        }
    }
}
