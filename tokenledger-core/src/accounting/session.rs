use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};
use uuid::Uuid;

use super::aggregator::aggregate;
use super::delta::compute_delta;
use super::tracker::Invocation;
use crate::config::{AccountingConfig, LedgerConfig};
use crate::models::metrics::{
    COMPLETION_TOKENS, PROMPT_TOKENS, SUCCESSFUL_REQUESTS, TIME_TAKEN_IN_SECONDS, TOTAL_COST,
    TOTAL_TOKENS,
};
use crate::models::{AggregateRecord, MetricTable, Origin, PricingTable, TokenUsage};

pub const NETWORK_TOKEN_ACCOUNTING: &str = "network_token_accounting";
pub const MODELS_TOKEN_ACCOUNTING: &str = "models_token_accounting";
pub const CUMULATIVE_NETWORK_TOKEN_ACCOUNTING: &str = "cumulative_network_token_accounting";
pub const CUMULATIVE_MODELS_TOKEN_ACCOUNTING: &str = "cumulative_models_token_accounting";

/// The four records produced when a root invocation completes.
#[derive(Debug, Clone, Serialize)]
pub struct TokenAccountingReport {
    #[serde(rename = "network_token_accounting")]
    pub network: AggregateRecord,
    #[serde(rename = "models_token_accounting")]
    pub models: MetricTable,
    #[serde(rename = "cumulative_network_token_accounting")]
    pub cumulative_network: AggregateRecord,
    #[serde(rename = "cumulative_models_token_accounting")]
    pub cumulative_models: MetricTable,
}

#[derive(Debug, Default)]
struct LedgerState {
    cumulative: MetricTable,
    previous: MetricTable,
    iteration_times: Vec<f64>,
}

/// Accounting state shared by every invocation of one conversation.
///
/// Independent sessions never share counters, snapshots or timing history.
/// Bookkeeping holds the state lock only for synchronous work.
#[derive(Debug)]
pub struct AccountingSession {
    id: Uuid,
    ordinal: AtomicU64,
    state: Mutex<LedgerState>,
    pricing: PricingTable,
    settings: AccountingConfig,
}

impl AccountingSession {
    pub fn new(settings: AccountingConfig, pricing: PricingTable) -> Self {
        Self {
            id: Uuid::new_v4(),
            ordinal: AtomicU64::new(0),
            state: Mutex::new(LedgerState::default()),
            pricing,
            settings,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(AccountingConfig::default(), PricingTable::new())
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            config.accounting.clone(),
            PricingTable::from_entries(config.pricing.iter().cloned()),
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &AccountingConfig {
        &self.settings
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Allocate the next ordinal. The first invocation after a reset is the root.
    pub fn begin_invocation(&self, origin: Origin) -> Invocation {
        let ordinal = self.ordinal.fetch_add(1, Ordering::SeqCst);
        debug!(
            session_id = %self.id,
            ordinal,
            origin = %origin,
            "Invocation started"
        );
        Invocation::new(self.id, ordinal, origin)
    }

    /// The ordinal the next `begin_invocation` will hand out.
    pub fn next_ordinal(&self) -> u64 {
        self.ordinal.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_ordinals(&self) {
        self.ordinal.store(0, Ordering::SeqCst);
    }

    /// Cost of a request: provider-reported, else priced, else 0.
    pub fn resolve_cost(&self, provider: &str, model: &str, usage: &TokenUsage) -> f64 {
        if let Some(cost) = usage.total_cost {
            return cost;
        }
        match self.pricing.cost_for(provider, model, usage) {
            Ok(cost) => cost,
            Err(e) => {
                trace!(provider, model, error_code = e.error_code(), "No pricing for model");
                0.0
            }
        }
    }

    /// Add one model request to the cumulative table. Returns the cost recorded.
    pub fn record_model_usage(
        &self,
        provider: &str,
        model: &str,
        usage: &TokenUsage,
        elapsed_seconds: f64,
    ) -> f64 {
        let cost = self.resolve_cost(provider, model, usage);

        let mut state = self.state.lock();
        let stats = state.cumulative.model_mut(provider, model);
        stats.add(TOTAL_TOKENS, usage.total_tokens as f64);
        stats.add(PROMPT_TOKENS, usage.prompt_tokens as f64);
        stats.add(COMPLETION_TOKENS, usage.completion_tokens as f64);
        stats.add(SUCCESSFUL_REQUESTS, 1.0);
        stats.add(TOTAL_COST, cost);
        stats.add(TIME_TAKEN_IN_SECONDS, elapsed_seconds);

        trace!(
            session_id = %self.id,
            provider,
            model,
            total_tokens = usage.total_tokens,
            cost,
            "Recorded model usage"
        );

        cost
    }

    /// Close out a root invocation that took `elapsed_seconds`.
    ///
    /// Appends the elapsed time to the history before summing it, reports the
    /// usage since the previous flush, replaces the previous snapshot with the
    /// current totals and resets the ordinal counter.
    pub fn flush_cumulative(&self, elapsed_seconds: f64) -> TokenAccountingReport {
        let report = {
            let mut state = self.state.lock();
            state.iteration_times.push(elapsed_seconds);
            let cumulative_seconds: f64 = state.iteration_times.iter().sum();

            let models = compute_delta(&state.cumulative, &state.previous);
            let report = TokenAccountingReport {
                network: aggregate(&models, elapsed_seconds),
                models,
                cumulative_network: aggregate(&state.cumulative, cumulative_seconds),
                cumulative_models: state.cumulative.clone(),
            };

            state.previous = state.cumulative.clone();
            report
        };

        self.reset_ordinals();

        info!(
            session_id = %self.id,
            total_tokens = report.network.value(TOTAL_TOKENS),
            cumulative_tokens = report.cumulative_network.value(TOTAL_TOKENS),
            elapsed_seconds,
            "Flushed cumulative token accounting"
        );

        report
    }

    pub fn cumulative(&self) -> MetricTable {
        self.state.lock().cumulative.clone()
    }

    pub fn previous_snapshot(&self) -> MetricTable {
        self.state.lock().previous.clone()
    }

    pub fn iteration_times(&self) -> Vec<f64> {
        self.state.lock().iteration_times.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelPricing;

    #[test]
    fn test_ordinals_in_call_order() {
        let session = AccountingSession::with_defaults();
        let root = session.begin_invocation(Origin::root("frontman"));
        let first = session.begin_invocation(Origin::root("frontman").child("a"));
        let second = session.begin_invocation(Origin::root("frontman").child("b"));

        assert_eq!(root.ordinal(), 0);
        assert_eq!(first.ordinal(), 1);
        assert_eq!(second.ordinal(), 2);
        assert_eq!(session.next_ordinal(), 3);
    }

    #[test]
    fn test_record_model_usage_updates_cumulative() {
        let session = AccountingSession::with_defaults();
        let cost = session.record_model_usage(
            "openai",
            "gpt-4o",
            &TokenUsage::new(6, 4).with_cost(0.01),
            0.5,
        );
        assert_eq!(cost, 0.01);

        let cumulative = session.cumulative();
        assert_eq!(cumulative.get("openai", "gpt-4o", TOTAL_TOKENS), Some(10.0));
        assert_eq!(cumulative.get("openai", "gpt-4o", SUCCESSFUL_REQUESTS), Some(1.0));
        assert_eq!(cumulative.get("openai", "gpt-4o", TIME_TAKEN_IN_SECONDS), Some(0.5));
    }

    #[test]
    fn test_resolve_cost_precedence() {
        let pricing = PricingTable::from_entries(vec![
            ModelPricing::new("gpt-4o", "openai").with_pricing(1.0, 2.0)
        ]);
        let session = AccountingSession::new(AccountingConfig::default(), pricing);

        let priced = TokenUsage::new(1000, 1000);
        assert_eq!(session.resolve_cost("openai", "gpt-4o", &priced), 3.0);
        assert_eq!(
            session.resolve_cost("openai", "gpt-4o", &priced.with_cost(0.5)),
            0.5
        );
        assert_eq!(session.resolve_cost("openai", "unknown", &priced), 0.0);
    }

    #[test]
    fn test_flush_replaces_snapshot_and_resets_ordinal() {
        let session = AccountingSession::with_defaults();
        let _root = session.begin_invocation(Origin::root("frontman"));
        session.record_model_usage("openai", "gpt-4o", &TokenUsage::new(4, 6), 0.1);

        let report = session.flush_cumulative(1.0);
        assert_eq!(report.network.value(TOTAL_TOKENS), 10.0);
        assert_eq!(report.network.time_taken_in_seconds, 1.0);
        assert_eq!(session.previous_snapshot(), session.cumulative());
        assert_eq!(session.next_ordinal(), 0);

        let again = session.flush_cumulative(2.0);
        assert!(again.models.is_all_zero());
        assert_eq!(again.cumulative_network.value(TOTAL_TOKENS), 10.0);
        assert_eq!(again.cumulative_network.time_taken_in_seconds, 3.0);
        assert_eq!(session.iteration_times(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_report_serializes_with_reporting_keys() {
        let session = AccountingSession::with_defaults();
        session.record_model_usage("openai", "gpt-4o", &TokenUsage::new(1, 1), 0.0);
        let value = serde_json::to_value(session.flush_cumulative(0.5)).unwrap();

        for key in [
            NETWORK_TOKEN_ACCOUNTING,
            MODELS_TOKEN_ACCOUNTING,
            CUMULATIVE_NETWORK_TOKEN_ACCOUNTING,
            CUMULATIVE_MODELS_TOKEN_ACCOUNTING,
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value[NETWORK_TOKEN_ACCOUNTING]["total_tokens"], 2);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = AccountingSession::with_defaults();
        let b = AccountingSession::with_defaults();
        a.begin_invocation(Origin::root("x"));
        a.record_model_usage("openai", "gpt-4o", &TokenUsage::new(1, 1), 0.0);

        assert_eq!(b.next_ordinal(), 0);
        assert!(b.cumulative().is_empty());
        assert_ne!(a.id(), b.id());
    }
}
