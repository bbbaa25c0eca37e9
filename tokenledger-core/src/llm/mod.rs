//! Seam between agents and provider-specific model clients.
//!
//! Provider policies are registered with an [`LlmClientFactory`], which picks
//! one by the `class` of an [`LlmConfig`]. Model requests made through
//! [`invoke_counted`] are attributed to the calling invocation.

mod config;
mod counting;
mod factory;
mod policy;
mod provider;

pub use config::LlmConfig;
pub use counting::invoke_counted;
pub use factory::LlmClientFactory;
pub use policy::{
    ChatMessage, Completion, CompletionRequest, DynLanguageModel, DynLlmPolicy, LanguageModel,
    LlmPolicy, LlmResources,
};
pub use provider::ProviderClass;
