use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::LlmDefaults;
use crate::error::{LedgerError, LedgerResult};

/// Configuration for one language model.
///
/// Keys the factory does not interpret are kept in `extra` for the provider
/// policy to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_fraction: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl LlmConfig {
    pub fn new(class: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            model_name: Some(model_name.into()),
            ..Self::default()
        }
    }

    pub fn from_value(value: Value) -> LedgerResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The model name from `model_name`, then `model`, then `model_id`.
    pub fn resolved_model_name(&self) -> Option<&str> {
        non_empty(&self.model_name)
            .or_else(|| non_empty(&self.model))
            .or_else(|| non_empty(&self.model_id))
    }

    /// A string setting from the config, falling back to an environment variable.
    pub fn value_or_env(&self, key: &str, env_var: &str) -> Option<String> {
        match self.extra.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => std::env::var(env_var).ok().filter(|v| !v.is_empty()),
        }
    }

    /// Like [`value_or_env`](Self::value_or_env), for settings a provider cannot work without.
    pub fn require_value_or_env(&self, key: &str, env_var: &str) -> LedgerResult<String> {
        self.value_or_env(key, env_var)
            .ok_or_else(|| LedgerError::MissingEnvVar(env_var.to_string()))
    }

    /// Fill unset fields from `defaults`.
    pub fn with_defaults(mut self, defaults: &LlmDefaults) -> Self {
        if non_empty(&self.class).is_none() {
            self.class = Some(defaults.class.clone());
        }
        if self.resolved_model_name().is_none() {
            self.model_name = Some(defaults.model_name.clone());
        }
        if self.temperature.is_none() {
            self.temperature = Some(defaults.temperature);
        }
        if self.prompt_token_fraction.is_none() {
            self.prompt_token_fraction = Some(defaults.prompt_token_fraction);
        }
        if self.max_tokens.is_none() {
            self.max_tokens = defaults.max_tokens;
        }
        self
    }

    /// Token budget for a prompt when `max_tokens` is known.
    pub fn max_prompt_tokens(&self) -> Option<u32> {
        let max_tokens = self.max_tokens?;
        let fraction = self.prompt_token_fraction.unwrap_or(0.5);
        Some((f64::from(max_tokens) * fraction).floor() as u32)
    }
}
