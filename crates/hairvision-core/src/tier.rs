//! Subscription tiers.
//!
//! A salon's tier determines its monthly credit allotment and the price of
//! every credit consumed beyond its allotment plus purchased credits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Constants
// ============================================================================

/// Essential tier monthly credit allotment.
pub const ESSENTIAL_MONTHLY_CREDITS: i64 = 100;

/// Professional tier monthly credit allotment.
pub const PROFESSIONAL_MONTHLY_CREDITS: i64 = 500;

/// Enterprise tier monthly credit allotment.
pub const ENTERPRISE_MONTHLY_CREDITS: i64 = 2000;

/// Essential tier overage price per credit in cents ($0.50).
pub const ESSENTIAL_OVERAGE_CENTS: i64 = 50;

/// Professional tier overage price per credit in cents ($0.40).
pub const PROFESSIONAL_OVERAGE_CENTS: i64 = 40;

/// Enterprise tier overage price per credit in cents ($0.30).
pub const ENTERPRISE_OVERAGE_CENTS: i64 = 30;

/// Essential tier monthly price in cents ($49).
pub const ESSENTIAL_PRICE_CENTS: i64 = 4900;

/// Professional tier monthly price in cents ($149).
pub const PROFESSIONAL_PRICE_CENTS: i64 = 14900;

/// Enterprise tier monthly price in cents ($399).
pub const ENTERPRISE_PRICE_CENTS: i64 = 39900;

/// Available subscription tiers, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Entry tier, assigned to new salons.
    Essential,

    /// Mid tier for busy salons.
    Professional,

    /// Chains and franchises.
    Enterprise,
}

impl SubscriptionTier {
    /// Every tier, lowest first.
    pub const ALL: [Self; 3] = [Self::Essential, Self::Professional, Self::Enterprise];

    /// The tier new salons start on.
    #[must_use]
    pub const fn lowest() -> Self {
        Self::Essential
    }

    /// Monthly credit allotment for this tier.
    #[must_use]
    pub const fn monthly_credits(&self) -> i64 {
        match self {
            Self::Essential => ESSENTIAL_MONTHLY_CREDITS,
            Self::Professional => PROFESSIONAL_MONTHLY_CREDITS,
            Self::Enterprise => ENTERPRISE_MONTHLY_CREDITS,
        }
    }

    /// Price of one overage credit in cents.
    #[must_use]
    pub const fn overage_price_cents(&self) -> i64 {
        match self {
            Self::Essential => ESSENTIAL_OVERAGE_CENTS,
            Self::Professional => PROFESSIONAL_OVERAGE_CENTS,
            Self::Enterprise => ENTERPRISE_OVERAGE_CENTS,
        }
    }

    /// Monthly subscription price in cents.
    #[must_use]
    pub const fn monthly_price_cents(&self) -> i64 {
        match self {
            Self::Essential => ESSENTIAL_PRICE_CENTS,
            Self::Professional => PROFESSIONAL_PRICE_CENTS,
            Self::Enterprise => ENTERPRISE_PRICE_CENTS,
        }
    }

    /// Get the tier name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        Self::lowest()
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "essential" => Ok(Self::Essential),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(CoreError::UnknownTier(s.to_string())),
        }
    }
}
