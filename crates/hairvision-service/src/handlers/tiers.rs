//! Subscription tier catalogue.

use axum::Json;
use serde::Serialize;

use hairvision_core::SubscriptionTier;

/// One row of the tier table.
#[derive(Debug, Serialize)]
pub struct TierResponse {
    /// Tier name.
    pub tier: SubscriptionTier,
    /// Credits granted each cycle.
    pub monthly_credits: i64,
    /// Price per overage credit in cents.
    pub overage_price_cents: i64,
    /// Subscription price in cents per month.
    pub monthly_price_cents: i64,
}

/// Tier table response.
#[derive(Debug, Serialize)]
pub struct TiersResponse {
    /// All tiers, cheapest first.
    pub tiers: Vec<TierResponse>,
}

/// List subscription tiers.
pub async fn list_tiers() -> Json<TiersResponse> {
    let tiers = SubscriptionTier::ALL
        .iter()
        .map(|tier| TierResponse {
            tier: *tier,
            monthly_credits: tier.monthly_credits(),
            overage_price_cents: tier.overage_price_cents(),
            monthly_price_cents: tier.monthly_price_cents(),
        })
        .collect();

    Json(TiersResponse { tiers })
}
