use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{LedgerError, LedgerResult};

/// Token usage reported for a single model request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Cost in USD when the provider reports it directly.
    #[serde(default)]
    pub total_cost: Option<f64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            total_cost: None,
        }
    }

    /// Usage known only as a total, split by `prompt_fraction`.
    pub fn from_total(total_tokens: u64, prompt_fraction: f64) -> Self {
        let prompt_tokens = (total_tokens as f64 * prompt_fraction).round() as u64;
        let prompt_tokens = prompt_tokens.min(total_tokens);
        Self {
            prompt_tokens,
            completion_tokens: total_tokens - prompt_tokens,
            total_tokens,
            total_cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.total_cost = Some(cost);
        self
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Model pricing information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Model ID
    pub model: String,
    /// Provider ID
    pub provider: String,
    /// Cost per 1K input tokens (USD)
    pub input_cost_per_1k: f64,
    /// Cost per 1K output tokens (USD)
    pub output_cost_per_1k: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl ModelPricing {
    #[must_use]
    pub fn new(model: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
            currency: default_currency(),
        }
    }

    #[must_use]
    pub fn with_pricing(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.input_cost_per_1k = input_per_1k;
        self.output_cost_per_1k = output_per_1k;
        self
    }

    #[must_use]
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1000.0) * self.input_cost_per_1k;
        let output_cost = (output_tokens as f64 / 1000.0) * self.output_cost_per_1k;
        input_cost + output_cost
    }
}

/// Pricing lookup keyed by (provider, model).
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: HashMap<(String, String), ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries for the same (provider, model) replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = ModelPricing>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    pub fn insert(&mut self, pricing: ModelPricing) {
        self.entries
            .insert((pricing.provider.clone(), pricing.model.clone()), pricing);
    }

    pub fn find(&self, provider: &str, model: &str) -> Option<&ModelPricing> {
        self.entries.get(&(provider.to_string(), model.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cost_for(&self, provider: &str, model: &str, usage: &TokenUsage) -> LedgerResult<f64> {
        let pricing = self
            .find(provider, model)
            .ok_or_else(|| LedgerError::ModelPricingNotFound {
                model: model.to_string(),
                provider: provider.to_string(),
            })?;
        Ok(pricing.calculate_cost(usage.prompt_tokens, usage.completion_tokens))
    }
}
