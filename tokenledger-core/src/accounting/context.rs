use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

use super::handler::UsageHandler;
use super::session::{
    AccountingSession, TokenAccountingReport, CUMULATIVE_MODELS_TOKEN_ACCOUNTING,
    CUMULATIVE_NETWORK_TOKEN_ACCOUNTING, MODELS_TOKEN_ACCOUNTING, NETWORK_TOKEN_ACCOUNTING,
};
use crate::error::LedgerResult;
use crate::journal::DynReportingSink;
use crate::models::{Origin, TokenUsage};

/// Per-request report surface the root invocation fills in on completion.
#[derive(Debug, Clone, Default)]
pub struct RequestReporting {
    entries: Arc<Mutex<Map<String, Value>>>,
}

impl RequestReporting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Overwrite the four token accounting keys with `report`.
    pub fn apply_report(&self, report: &TokenAccountingReport) -> LedgerResult<()> {
        let network = serde_json::to_value(&report.network)?;
        let models = serde_json::to_value(&report.models)?;
        let cumulative_network = serde_json::to_value(&report.cumulative_network)?;
        let cumulative_models = serde_json::to_value(&report.cumulative_models)?;

        let mut entries = self.entries.lock();
        entries.insert(NETWORK_TOKEN_ACCOUNTING.to_string(), network);
        entries.insert(MODELS_TOKEN_ACCOUNTING.to_string(), models);
        entries.insert(CUMULATIVE_NETWORK_TOKEN_ACCOUNTING.to_string(), cumulative_network);
        entries.insert(CUMULATIVE_MODELS_TOKEN_ACCOUNTING.to_string(), cumulative_models);
        Ok(())
    }
}

/// Explicit accounting context handed to every unit of work.
///
/// A unit of work must forward the context it receives to any nested
/// invocation it starts. Each scope gets its own handler chain, so
/// concurrently running siblings never see each other's handlers.
///
/// Usage recorded in a nested scope also lands in every enclosing scope's
/// handler: an agent's totals include the agents it called.
#[derive(Clone)]
pub struct InvocationContext {
    pub(crate) session: Arc<AccountingSession>,
    pub(crate) origin: Origin,
    pub(crate) handlers: Vec<Arc<UsageHandler>>,
    pub(crate) reporting: RequestReporting,
    pub(crate) sink: Option<DynReportingSink>,
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("session_id", &self.session.id())
            .field("origin", &self.origin)
            .field("handlers", &self.handlers.len())
            .field("sink", &self.sink.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl InvocationContext {
    /// A top-level context with an empty origin and no handlers installed.
    pub fn new(session: Arc<AccountingSession>) -> Self {
        Self {
            session,
            origin: Origin::default(),
            handlers: Vec::new(),
            reporting: RequestReporting::new(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: DynReportingSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_reporting(mut self, reporting: RequestReporting) -> Self {
        self.reporting = reporting;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn session(&self) -> &Arc<AccountingSession> {
        &self.session
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn request_reporting(&self) -> &RequestReporting {
        &self.reporting
    }

    pub fn sink(&self) -> Option<&DynReportingSink> {
        self.sink.as_ref()
    }

    /// Number of usage handlers enclosing this context.
    pub fn scope_depth(&self) -> usize {
        self.handlers.len()
    }

    /// Start and run an invocation of `agent_name` below this context.
    pub async fn count_tokens<F, Fut, T, E>(&self, agent_name: &str, work: F) -> Result<T, E>
    where
        F: FnOnce(InvocationContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let invocation = self.session.begin_invocation(self.origin.child(agent_name));
        self.run_scoped(invocation, work).await
    }

    /// Record one model request against this context.
    ///
    /// Returns the cost that was recorded.
    pub fn record_usage(
        &self,
        provider: &str,
        model: &str,
        usage: &TokenUsage,
        elapsed_seconds: f64,
    ) -> f64 {
        let cost = self
            .session
            .record_model_usage(provider, model, usage, elapsed_seconds);
        for handler in &self.handlers {
            handler.add(usage, cost);
        }
        trace!(
            origin = %self.origin,
            provider,
            model,
            scopes = self.handlers.len(),
            "Attributed model usage"
        );
        cost
    }
}
