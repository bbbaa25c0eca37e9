//! Per-invocation token and cost accounting.
//!
//! An [`AccountingSession`] owns the running totals for one conversation.
//! Each agent call runs through [`InvocationContext::count_tokens`], which
//! assigns it an ordinal and a usage handler. The first invocation after a
//! flush (ordinal 0) is the root; when it completes it reports the usage since
//! the previous root alongside the session totals.
//!
//! Nested usage is inclusive: a model request made by a sub-agent is counted
//! for the sub-agent and for every agent above it in the call chain.

mod aggregator;
mod context;
mod delta;
mod handler;
mod session;
mod tracker;

pub use aggregator::aggregate;
pub use context::{InvocationContext, RequestReporting};
pub use delta::compute_delta;
pub use handler::{UsageCounters, UsageHandler};
pub use session::{
    AccountingSession, TokenAccountingReport, CUMULATIVE_MODELS_TOKEN_ACCOUNTING,
    CUMULATIVE_NETWORK_TOKEN_ACCOUNTING, MODELS_TOKEN_ACCOUNTING, NETWORK_TOKEN_ACCOUNTING,
};
pub use tracker::{AgentTokenAccounting, Invocation, InvocationState};
