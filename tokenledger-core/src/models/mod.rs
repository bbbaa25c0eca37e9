mod message;
pub mod metrics;
mod origin;
mod usage;

pub use message::{AgentMessage, ReportKind};
pub use metrics::{AggregateRecord, MetricStats, MetricTable};
pub use origin::Origin;
pub use usage::{ModelPricing, PricingTable, TokenUsage};
