//! Guarded image generation.
//!
//! A generation is priced first, then gated by the overage policy and the
//! circuit breaker, and only charged once the upstream call succeeds.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hairvision_core::{CreditBalance, CreditStats, Resolution};

use super::parse_salon_id;
use crate::error::ApiError;
use crate::gemini::GenerationRequest;
use crate::ledger::UsageReport;
use crate::state::AppState;

/// Generation request body.
#[derive(Debug, Deserialize)]
pub struct CreateGenerationRequest {
    /// Styling instructions.
    pub prompt: String,
    /// Client photo, base64 encoded.
    pub image_base64: String,
    /// MIME type of the photo (default: "image/jpeg").
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Output resolution (default: 1k).
    #[serde(default)]
    pub resolution: Resolution,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

/// Generation response.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    /// Generated image, base64 encoded.
    pub image_base64: String,
    /// MIME type of the generated image.
    pub mime_type: String,
    /// Text returned alongside the image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Model that served the request.
    pub model: String,
    /// Output resolution.
    pub resolution: Resolution,
    /// Credits charged.
    pub credits_charged: i64,
    /// Upstream cost in cents.
    pub cost_cents: i64,
    /// Balance after the charge.
    pub balance: CreditBalance,
    /// Statistics after the charge.
    pub stats: CreditStats,
}

/// Generate a styled image for a salon.
pub async fn create_generation(
    State(state): State<Arc<AppState>>,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateGenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let salon_id = parse_salon_id(&salon_id)?;

    if req.prompt.trim().is_empty() {
        return Err(ApiError::InvalidArgument("prompt must not be empty".into()));
    }
    if req.image_base64.is_empty() {
        return Err(ApiError::InvalidArgument("image_base64 must not be empty".into()));
    }
    if general_purpose::STANDARD.decode(&req.image_base64).is_err() {
        return Err(ApiError::InvalidArgument(
            "image_base64 is not valid base64".into(),
        ));
    }
    if !req.mime_type.starts_with("image/") {
        return Err(ApiError::InvalidArgument(format!(
            "unsupported mime type: {}",
            req.mime_type
        )));
    }

    let model = req
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.gemini_default_model.clone());
    let quote = state.config.pricing.quote(&model, req.resolution);

    if !state.config.allow_overage {
        let balance = state.ledger.get_balance(&salon_id).await?;
        let available = CreditStats::compute(&balance, Utc::now()).available;
        if available < quote.credits {
            return Err(ApiError::InsufficientCredits {
                available,
                required: quote.credits,
            });
        }
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("image generation is not configured".into()))?;

    let now = Utc::now();
    if state.breaker.is_open_at(now) {
        let retry_after = state.breaker.retry_after_at(now).unwrap_or_default();
        tracing::info!(
            salon_id = %salon_id,
            retry_after_secs = retry_after.as_secs(),
            "Circuit open, rejecting generation"
        );
        return Err(ApiError::CircuitOpen {
            // Round up to whole seconds
            retry_after_secs: retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0),
        });
    }

    let request = GenerationRequest {
        prompt: req.prompt,
        image_base64: req.image_base64,
        mime_type: req.mime_type,
        model: model.clone(),
        resolution: req.resolution,
    };

    let image = match generator.generate(&request).await {
        Ok(image) => {
            state.breaker.record_success();
            image
        }
        Err(e) => {
            let breaker_state = state.breaker.record_failure();
            tracing::warn!(
                salon_id = %salon_id,
                model = %model,
                error = %e,
                breaker = ?breaker_state,
                "Image generation failed"
            );
            return Err(ApiError::UpstreamFailure(e.to_string()));
        }
    };

    let balance = state
        .ledger
        .record_usage(
            &salon_id,
            UsageReport {
                credits_used: quote.credits,
                model: model.clone(),
                resolution: req.resolution,
                cost_cents: quote.cost_cents,
            },
        )
        .await?;
    let stats = CreditStats::compute(&balance, Utc::now());

    tracing::info!(
        salon_id = %salon_id,
        model = %model,
        resolution = %req.resolution,
        credits = quote.credits,
        "Generated image"
    );

    Ok(Json(GenerationResponse {
        image_base64: image.image_base64,
        mime_type: image.mime_type,
        text: image.text,
        model,
        resolution: req.resolution,
        credits_charged: quote.credits,
        cost_cents: quote.cost_cents,
        balance,
        stats,
    }))
}
