//! Generation pricing.
//!
//! Salons are charged in credits, which depend only on the output resolution.
//! The upstream cost recorded alongside each usage record depends on the model
//! and is tracked for margin reporting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Resolution;

/// Default image model used when a request does not name one.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// A priced generation: what the salon is charged and what it cost us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationQuote {
    /// Credits charged to the salon.
    pub credits: i64,
    /// Upstream cost in cents.
    pub cost_cents: i64,
}

/// Pricing configuration for image generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPricing {
    /// Upstream cost per credit in cents, by model name.
    pub model_cost_cents_per_credit: HashMap<String, i64>,

    /// Cost per credit for models not in the table.
    pub default_cost_cents_per_credit: i64,
}

impl Default for GenerationPricing {
    fn default() -> Self {
        let mut model_cost_cents_per_credit = HashMap::new();
        model_cost_cents_per_credit.insert(DEFAULT_IMAGE_MODEL.to_string(), 4); // ~$0.039 per image
        model_cost_cents_per_credit.insert("gemini-2.0-flash-exp".to_string(), 4);
        model_cost_cents_per_credit.insert("gemini-3-pro-image-preview".to_string(), 14);

        Self {
            model_cost_cents_per_credit,
            default_cost_cents_per_credit: 5,
        }
    }
}

impl GenerationPricing {
    /// Upstream cost of one credit on `model`, in cents.
    #[must_use]
    pub fn cost_per_credit(&self, model: &str) -> i64 {
        self.model_cost_cents_per_credit
            .get(model)
            .copied()
            .unwrap_or(self.default_cost_cents_per_credit)
    }

    /// Price one generation.
    #[must_use]
    pub fn quote(&self, model: &str, resolution: Resolution) -> GenerationQuote {
        let credits = resolution.credits();

        GenerationQuote {
            credits,
            cost_cents: credits * self.cost_per_credit(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_known_model() {
        let pricing = GenerationPricing::default();
        let quote = pricing.quote(DEFAULT_IMAGE_MODEL, Resolution::High);
        assert_eq!(quote.credits, 2);
        assert_eq!(quote.cost_cents, 8);
    }

    #[test]
    fn quote_unknown_model_uses_default() {
        let pricing = GenerationPricing::default();
        let quote = pricing.quote("mystery-model", Resolution::Ultra);
        assert_eq!(quote.credits, 4);
        assert_eq!(quote.cost_cents, 20);
        assert_eq!(pricing.cost_per_credit("mystery-model"), 5);
    }
}
