use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use super::context::InvocationContext;
use super::handler::{UsageCounters, UsageHandler};
use super::session::{
    AccountingSession, TokenAccountingReport, CUMULATIVE_MODELS_TOKEN_ACCOUNTING,
    CUMULATIVE_NETWORK_TOKEN_ACCOUNTING, MODELS_TOKEN_ACCOUNTING, NETWORK_TOKEN_ACCOUNTING,
};
use crate::error::{LedgerError, LedgerResult};
use crate::error_context;
use crate::models::metrics::serialize_metric;
use crate::models::{AgentMessage, Origin, ReportKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Pending,
    Counting,
    Reported,
    CumulativeFlushed,
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationState::Pending => write!(f, "pending"),
            InvocationState::Counting => write!(f, "counting"),
            InvocationState::Reported => write!(f, "reported"),
            InvocationState::CumulativeFlushed => write!(f, "cumulative_flushed"),
        }
    }
}

/// One agent call being counted.
#[derive(Debug, Clone)]
pub struct Invocation {
    id: Uuid,
    session_id: Uuid,
    ordinal: u64,
    origin: Origin,
    state: InvocationState,
    started_at: DateTime<Utc>,
    elapsed: Option<Duration>,
}

impl Invocation {
    pub(crate) fn new(session_id: Uuid, ordinal: u64, origin: Origin) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            ordinal,
            origin,
            state: InvocationState::Pending,
            started_at: Utc::now(),
            elapsed: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The session whose counter issued this invocation's ordinal.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// The root of a call chain holds ordinal 0.
    pub fn is_frontman(&self) -> bool {
        self.ordinal == 0
    }

    fn can_transition_to(&self, next: InvocationState) -> bool {
        matches!(
            (self.state, next),
            (InvocationState::Pending, InvocationState::Counting)
                | (InvocationState::Counting, InvocationState::Reported)
        ) || (self.is_frontman()
            && self.state == InvocationState::Reported
            && next == InvocationState::CumulativeFlushed)
    }

    pub fn transition(&mut self, next: InvocationState) -> LedgerResult<()> {
        if !self.can_transition_to(next) {
            return Err(LedgerError::InvalidInvocationState {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(
            invocation_id = %self.id,
            ordinal = self.ordinal,
            origin = %self.origin,
            from = %self.state,
            to = %next,
            "Invocation state transition"
        );
        self.state = next;
        Ok(())
    }

    fn advance(&mut self, next: InvocationState) {
        if let Err(e) = self.transition(next) {
            e.log_with_context(&error_context!("invocation transition"));
        }
    }
}

/// Per-invocation record written to the reporting sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentTokenAccounting {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub successful_requests: u64,
    #[serde(serialize_with = "serialize_metric")]
    pub total_cost: f64,
    pub time_taken_in_seconds: f64,
    pub caveats: Vec<String>,
}

impl AgentTokenAccounting {
    pub fn new(counters: UsageCounters, time_taken_in_seconds: f64, caveats: Vec<String>) -> Self {
        Self {
            total_tokens: counters.total_tokens,
            prompt_tokens: counters.prompt_tokens,
            completion_tokens: counters.completion_tokens,
            successful_requests: counters.successful_requests,
            total_cost: counters.total_cost,
            time_taken_in_seconds,
            caveats,
        }
    }

    /// Key under which the record for `agent_name` is journaled.
    pub fn record_key(agent_name: &str) -> String {
        format!("{}_token_accounting", agent_name)
    }

    pub fn to_structure(&self, agent_name: &str) -> LedgerResult<Map<String, Value>> {
        let mut structure = Map::new();
        structure.insert(Self::record_key(agent_name), serde_json::to_value(self)?);
        Ok(structure)
    }
}

/// Resets the session's ordinal counter if a root invocation ends without
/// flushing, either through an error or because its future was dropped.
struct OrdinalGuard {
    session: Arc<AccountingSession>,
    ordinal: u64,
    armed: bool,
}

impl OrdinalGuard {
    fn new(session: Arc<AccountingSession>, ordinal: u64) -> Self {
        Self {
            session,
            ordinal,
            armed: ordinal == 0,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OrdinalGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(
                session_id = %self.session.id(),
                ordinal = self.ordinal,
                "Root invocation ended without reporting, resetting ordinals"
            );
            self.session.reset_ordinals();
        }
    }
}

impl InvocationContext {
    /// Run `work` in its own accounting scope for `invocation`.
    ///
    /// `work` receives a child context bound to the invocation's origin with a
    /// fresh usage handler appended to this context's handler chain. On
    /// success the invocation is reported, and a root invocation also flushes
    /// the session totals into the request reporting. On failure nothing is
    /// reported and the error is returned unchanged.
    ///
    /// An invocation begun in another session is not counted: `work` still
    /// runs in a child scope, but nothing is reported or flushed.
    pub async fn run_scoped<F, Fut, T, E>(
        &self,
        mut invocation: Invocation,
        work: F,
    ) -> Result<T, E>
    where
        F: FnOnce(InvocationContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let handler = Arc::new(UsageHandler::new());
        let mut handlers = self.handlers.clone();
        handlers.push(handler.clone());

        let scoped = InvocationContext {
            session: self.session.clone(),
            origin: invocation.origin.clone(),
            handlers,
            reporting: self.reporting.clone(),
            sink: self.sink.clone(),
        };

        if invocation.session_id != self.session.id() {
            LedgerError::ForeignInvocation {
                invocation_session: invocation.session_id.to_string(),
                session: self.session.id().to_string(),
            }
            .log_with_context(&error_context!("run scoped invocation"));
            return work(scoped).await;
        }

        let mut guard = OrdinalGuard::new(self.session.clone(), invocation.ordinal);
        invocation.advance(InvocationState::Counting);

        let start = Instant::now();
        let value = work(scoped).await?;
        let elapsed = start.elapsed();
        invocation.elapsed = Some(elapsed);

        if self.session.settings().enabled {
            self.report(&mut invocation, &handler, elapsed.as_secs_f64())
                .await;
            if invocation.is_frontman() {
                guard.disarm();
            }
        }

        Ok(value)
    }

    async fn report(&self, invocation: &mut Invocation, handler: &UsageHandler, elapsed: f64) {
        invocation.advance(InvocationState::Reported);

        let settings = self.session.settings();
        if settings.emit_invocation_records {
            if let Some(sink) = &self.sink {
                let record = AgentTokenAccounting::new(
                    handler.snapshot(),
                    elapsed,
                    settings.caveats.clone(),
                );
                let message = record
                    .to_structure(invocation.origin.agent_name())
                    .map_err(accounting_failure)
                    .map(|structure| {
                        AgentMessage::new(
                            invocation.origin.clone(),
                            ReportKind::InvocationAccounting,
                            structure,
                        )
                    });
                let written = match message {
                    Ok(message) => sink.write_message(message).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    e.log_with_context(&error_context!("write invocation accounting"));
                }
            }
        }

        if !invocation.is_frontman() {
            return;
        }

        let report = self.session.flush_cumulative(elapsed);
        if let Err(e) = self.reporting.apply_report(&report).map_err(accounting_failure) {
            e.log_with_context(&error_context!("apply token accounting report"));
        }
        invocation.advance(InvocationState::CumulativeFlushed);

        if let Some(sink) = &self.sink {
            for (kind, key, structure) in network_records(&report) {
                let message = structure.map_err(accounting_failure).map(|value| {
                    let mut map = Map::new();
                    map.insert(key.to_string(), value);
                    AgentMessage::new(invocation.origin.clone(), kind, map)
                });
                let written = match message {
                    Ok(message) => sink.write_message(message).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    e.log_with_context(&error_context!("write network accounting"));
                }
            }
        }
    }
}

/// Failures while building accounting output are themselves accounting errors.
fn accounting_failure(err: LedgerError) -> LedgerError {
    if err.is_accounting_error() {
        err
    } else {
        LedgerError::ReportFailed(err.to_string())
    }
}

fn network_records(
    report: &TokenAccountingReport,
) -> Vec<(ReportKind, &'static str, LedgerResult<Value>)> {
    vec![
        (
            ReportKind::Network,
            NETWORK_TOKEN_ACCOUNTING,
            serde_json::to_value(&report.network).map_err(LedgerError::from),
        ),
        (
            ReportKind::Models,
            MODELS_TOKEN_ACCOUNTING,
            serde_json::to_value(&report.models).map_err(LedgerError::from),
        ),
        (
            ReportKind::CumulativeNetwork,
            CUMULATIVE_NETWORK_TOKEN_ACCOUNTING,
            serde_json::to_value(&report.cumulative_network).map_err(LedgerError::from),
        ),
        (
            ReportKind::CumulativeModels,
            CUMULATIVE_MODELS_TOKEN_ACCOUNTING,
            serde_json::to_value(&report.cumulative_models).map_err(LedgerError::from),
        ),
    ]
}
