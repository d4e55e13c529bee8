//! Credit balance, purchase, subscription and usage handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hairvision_core::{CreditAlert, CreditBalance, CreditStats, CreditUsageRecord, Resolution};

use super::parse_salon_id;
use crate::error::ApiError;
use crate::ledger::UsageReport;
use crate::state::AppState;

/// Balance plus derived statistics.
#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    /// The stored balance after rollover.
    pub balance: CreditBalance,
    /// Statistics derived from the balance.
    pub stats: CreditStats,
}

impl CreditsResponse {
    /// Build a response, computing statistics as of now.
    #[must_use]
    pub fn new(balance: CreditBalance) -> Self {
        let stats = CreditStats::compute(&balance, Utc::now());
        Self { balance, stats }
    }
}

/// Get a salon's balance and statistics.
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let balance = state.ledger.get_balance(&salon_id).await?;

    Ok(Json(CreditsResponse::new(balance)))
}

/// Purchase credits request.
#[derive(Debug, Deserialize)]
pub struct PurchaseCreditsRequest {
    /// Number of credits to add.
    pub amount: i64,
}

/// Add purchased credits.
pub async fn purchase_credits(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
    Json(req): Json<PurchaseCreditsRequest>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let balance = state
        .ledger
        .purchase_credits(&salon_id, req.amount)
        .await?;

    Ok(Json(CreditsResponse::new(balance)))
}

/// Subscription change request.
#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    /// New tier name (case-insensitive).
    pub tier: String,
}

/// Change a salon's subscription tier.
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let balance = state
        .ledger
        .update_subscription(&salon_id, &req.tier)
        .await?;

    Ok(Json(CreditsResponse::new(balance)))
}

/// Usage report request.
#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    /// Credits consumed.
    pub credits_used: i64,
    /// Model used (defaults to the configured model).
    #[serde(default)]
    pub model: Option<String>,
    /// Output resolution (defaults to 1k).
    #[serde(default)]
    pub resolution: Resolution,
    /// Upstream cost in cents (defaults to the model's rate).
    #[serde(default)]
    pub cost_cents: Option<i64>,
}

/// Record usage that happened outside the generation endpoint.
pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
    Json(req): Json<RecordUsageRequest>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let model = req
        .model
        .unwrap_or_else(|| state.config.gemini_default_model.clone());
    let cost_cents = req.cost_cents.unwrap_or_else(|| {
        req.credits_used
            .max(0)
            .saturating_mul(state.config.pricing.cost_per_credit(&model))
    });

    let balance = state
        .ledger
        .record_usage(
            &salon_id,
            UsageReport {
                credits_used: req.credits_used,
                model,
                resolution: req.resolution,
                cost_cents,
            },
        )
        .await?;

    Ok(Json(CreditsResponse::new(balance)))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of records to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Usage history response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Records, newest first.
    pub records: Vec<CreditUsageRecord>,
    /// Offset the page starts at.
    pub offset: usize,
}

/// List a salon's usage history.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let records = state
        .ledger
        .usage_history(&salon_id, query.limit, query.offset)
        .await?;

    Ok(Json(HistoryResponse {
        records,
        offset: query.offset,
    }))
}

/// Alerts response.
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    /// Salon the alerts belong to.
    pub salon_id: String,
    /// Active alerts, most severe first.
    pub alerts: Vec<CreditAlert>,
    /// Statistics the alerts were derived from.
    pub stats: CreditStats,
}

/// Get a salon's active credit alerts.
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;
    let balance = state.ledger.get_balance(&salon_id).await?;
    let stats = CreditStats::compute(&balance, Utc::now());

    Ok(Json(AlertsResponse {
        salon_id: salon_id.to_string(),
        alerts: stats.alerts(),
        stats,
    }))
}
