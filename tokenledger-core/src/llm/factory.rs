use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::config::LlmConfig;
use super::policy::{DynLlmPolicy, LlmResources};
use super::provider::ProviderClass;
use crate::config::LlmDefaults;
use crate::error::{LedgerError, LedgerResult};

/// Creates language models from llm configs by dispatching on their `class`.
pub struct LlmClientFactory {
    policies: RwLock<HashMap<ProviderClass, DynLlmPolicy>>,
    defaults: LlmDefaults,
}

impl Default for LlmClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClientFactory {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
            defaults: LlmDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: LlmDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &LlmDefaults {
        &self.defaults
    }

    pub async fn register(&self, policy: DynLlmPolicy) -> LedgerResult<()> {
        let provider = policy.provider();

        let mut policies = self.policies.write().await;
        if policies.contains_key(&provider) {
            return Err(LedgerError::LlmPolicyAlreadyRegistered(
                provider.to_string(),
            ));
        }
        policies.insert(provider, policy);

        info!("Registered llm policy for provider '{}'", provider);
        Ok(())
    }

    pub async fn unregister(&self, provider: ProviderClass) -> Option<DynLlmPolicy> {
        let removed = self.policies.write().await.remove(&provider);
        if removed.is_some() {
            info!("Unregistered llm policy for provider '{}'", provider);
        }
        removed
    }

    pub async fn is_registered(&self, provider: ProviderClass) -> bool {
        self.policies.read().await.contains_key(&provider)
    }

    pub async fn registered_providers(&self) -> Vec<ProviderClass> {
        let mut providers: Vec<ProviderClass> =
            self.policies.read().await.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    /// `config` with unset fields filled from this factory's defaults.
    pub fn full_config(&self, config: &LlmConfig) -> LlmConfig {
        config.clone().with_defaults(&self.defaults)
    }

    /// Build the model a fully specified `config` describes.
    pub async fn create_llm_resources(&self, config: &LlmConfig) -> LedgerResult<LlmResources> {
        let model_name = config.resolved_model_name().unwrap_or("unspecified");

        let class_name = match config.class.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(LedgerError::LlmClassUnspecified {
                    model: model_name.to_string(),
                })
            }
        };

        let provider =
            ProviderClass::from_name(class_name).ok_or_else(|| LedgerError::LlmClassUnrecognized {
                class: class_name.to_lowercase(),
                model: model_name.to_string(),
            })?;

        let policy = self
            .policies
            .read()
            .await
            .get(&provider)
            .cloned()
            .ok_or_else(|| LedgerError::LlmPolicyNotRegistered(provider.to_string()))?;

        let model_name = config
            .resolved_model_name()
            .ok_or_else(|| LedgerError::InvalidConfigValue {
                key: "model_name".to_string(),
                message: format!("No model name given for class {}", provider),
            })?;

        let model = policy.create_model(config, model_name)?;
        debug!(
            provider = %provider,
            model = model_name,
            "Created llm resources"
        );

        Ok(LlmResources::new(model, Some(policy)))
    }
}
