#![allow(
    clippy::needless_borrows_for_generic_args,
    clippy::manual_range_contains,
    clippy::type_complexity,
    clippy::len_zero
)]

pub mod accounting;
pub mod config;
pub mod error;
pub mod journal;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod rpc;
pub mod telemetry;
pub mod validation;

pub use accounting::{
    aggregate, compute_delta, AccountingSession, AgentTokenAccounting, Invocation,
    InvocationContext, InvocationState, RequestReporting, TokenAccountingReport, UsageCounters,
    UsageHandler, CUMULATIVE_MODELS_TOKEN_ACCOUNTING, CUMULATIVE_NETWORK_TOKEN_ACCOUNTING,
    MODELS_TOKEN_ACCOUNTING, NETWORK_TOKEN_ACCOUNTING,
};
pub use config::{
    get_config_dir, AccountingConfig, ConfigLoadError, LedgerConfig, LlmDefaults, LoggingConfig,
};
pub use error::{ErrorContext, LedgerError, LedgerResult};
pub use journal::{
    prepare_tool_start, tool_start_message, ChannelJournal, DynReportingSink, MemoryJournal,
    ReportingSink, TracingJournal,
};
pub use llm::{
    invoke_counted, ChatMessage, Completion, CompletionRequest, DynLanguageModel, DynLlmPolicy,
    LanguageModel, LlmClientFactory, LlmConfig, LlmPolicy, LlmResources, ProviderClass,
};
pub use metadata::{minimize_metadata, MetadataKeys};
pub use models::{
    AgentMessage, AggregateRecord, MetricStats, MetricTable, ModelPricing, Origin, PricingTable,
    ReportKind, TokenUsage,
};
pub use rpc::{
    protocol_error, protocol_error_from, tool_error, ProtocolErrorEnvelope, RequestId,
    RpcErrorCode, ToolErrorEnvelope,
};
pub use telemetry::init_logging;
pub use validation::{
    name_to_spec, AgentNetworkValidator, CompositeNetworkValidator, CyclesNetworkValidator,
    KeywordNetworkValidator,
};
