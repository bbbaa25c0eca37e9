use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::config::LlmConfig;
use super::provider::ProviderClass;
use crate::error::LedgerResult;
use crate::error_context;
use crate::models::TokenUsage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(text)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// A ready-to-use model client.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn provider(&self) -> ProviderClass;

    fn model_name(&self) -> &str;

    async fn generate(&self, request: &CompletionRequest) -> LedgerResult<Completion>;
}

pub type DynLanguageModel = Arc<dyn LanguageModel>;

/// Builds models for one provider and owns whatever they need released.
#[async_trait]
pub trait LlmPolicy: Send + Sync {
    fn provider(&self) -> ProviderClass;

    fn create_model(&self, config: &LlmConfig, model_name: &str) -> LedgerResult<DynLanguageModel>;

    async fn release_resources(&self) -> LedgerResult<()> {
        Ok(())
    }
}

pub type DynLlmPolicy = Arc<dyn LlmPolicy>;

/// A model together with the policy responsible for its run-time resources.
#[derive(Clone)]
pub struct LlmResources {
    model: DynLanguageModel,
    policy: Option<DynLlmPolicy>,
}

impl LlmResources {
    pub fn new(model: DynLanguageModel, policy: Option<DynLlmPolicy>) -> Self {
        Self { model, policy }
    }

    pub fn model(&self) -> &DynLanguageModel {
        &self.model
    }

    pub fn policy(&self) -> Option<&DynLlmPolicy> {
        self.policy.as_ref()
    }

    /// Release the model's run-time resources. Failures are logged, not returned.
    pub async fn release_resources(&self) {
        let Some(policy) = &self.policy else {
            return;
        };
        match policy.release_resources().await {
            Ok(()) => debug!(
                provider = %policy.provider(),
                model = self.model.model_name(),
                "Released llm resources"
            ),
            Err(e) => e.log_with_context(&error_context!("release llm resources")),
        }
    }
}

impl std::fmt::Debug for LlmResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmResources")
            .field("provider", &self.model.provider())
            .field("model", &self.model.model_name())
            .field("has_policy", &self.policy.is_some())
            .finish()
    }
}
