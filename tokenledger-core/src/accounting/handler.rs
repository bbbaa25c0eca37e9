use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::metrics::serialize_metric;
use crate::models::TokenUsage;

/// Counters read off a [`UsageHandler`] once its scope completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub successful_requests: u64,
    #[serde(serialize_with = "serialize_metric")]
    pub total_cost: f64,
}

/// Collects usage for one invocation scope.
#[derive(Debug, Default)]
pub struct UsageHandler {
    counters: Mutex<UsageCounters>,
}

impl UsageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, usage: &TokenUsage, cost: f64) {
        let mut counters = self.counters.lock();
        counters.total_tokens = counters.total_tokens.saturating_add(usage.total_tokens);
        counters.prompt_tokens = counters.prompt_tokens.saturating_add(usage.prompt_tokens);
        counters.completion_tokens = counters
            .completion_tokens
            .saturating_add(usage.completion_tokens);
        counters.successful_requests = counters.successful_requests.saturating_add(1);
        counters.total_cost += cost;
    }

    pub fn snapshot(&self) -> UsageCounters {
        *self.counters.lock()
    }
}
