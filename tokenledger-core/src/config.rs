use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ModelPricing;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub accounting: AccountingConfig,

    #[serde(default)]
    pub llm: LlmDefaults,

    #[serde(default)]
    pub pricing: Vec<ModelPricing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,

    #[serde(default = "default_true")]
    pub with_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub emit_invocation_records: bool,

    #[serde(default = "default_caveats")]
    pub caveats: Vec<String>,
}

/// Defaults applied to llm configs that leave a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmDefaults {
    #[serde(default = "default_llm_class")]
    pub class: String,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_prompt_token_fraction")]
    pub prompt_token_fraction: f64,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_caveats() -> Vec<String> {
    vec![
        "Token usage is tracked at the agent level.".to_string(),
        "Token usage of nested agent calls is included in the calling agent's totals."
            .to_string(),
        "time_taken_in_seconds includes orchestration overhead.".to_string(),
    ]
}

fn default_llm_class() -> String {
    "openai".to_string()
}

fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_prompt_token_fraction() -> f64 {
    0.5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            emit_invocation_records: true,
            caveats: default_caveats(),
        }
    }
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            class: default_llm_class(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            prompt_token_fraction: default_prompt_token_fraction(),
            max_tokens: None,
        }
    }
}

impl LedgerConfig {
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("TOKENLEDGER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        let mut ledger_config: LedgerConfig = config.try_deserialize()?;

        if let Ok(level) = std::env::var("TOKENLEDGER_LOG_LEVEL") {
            ledger_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            ledger_config.logging.level = level;
        }

        ledger_config.validate()?;

        Ok(ledger_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ConfigLoadError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let fraction = self.llm.prompt_token_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigLoadError::InvalidValue {
                key: "llm.prompt_token_fraction".to_string(),
                message: "Must be greater than 0 and at most 1".to_string(),
            });
        }

        if self.llm.temperature < 0.0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "llm.temperature".to_string(),
                message: "Cannot be negative".to_string(),
            });
        }

        if self.llm.class.trim().is_empty() {
            return Err(ConfigLoadError::MissingRequired("llm.class".to_string()));
        }

        let mut seen = HashSet::new();
        for entry in &self.pricing {
            if entry.input_cost_per_1k < 0.0 || entry.output_cost_per_1k < 0.0 {
                return Err(ConfigLoadError::InvalidValue {
                    key: "pricing".to_string(),
                    message: format!(
                        "Negative cost for model '{}' from provider '{}'",
                        entry.model, entry.provider
                    ),
                });
            }
            if !seen.insert((entry.provider.as_str(), entry.model.as_str())) {
                return Err(ConfigLoadError::InvalidValue {
                    key: "pricing".to_string(),
                    message: format!(
                        "Duplicate pricing for model '{}' from provider '{}'",
                        entry.model, entry.provider
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("tokenledger.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("tokenledger").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".tokenledger").join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    for path in get_dotenv_paths() {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

fn get_dotenv_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
        paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("tokenledger").join(".env"));
    }

    paths
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tokenledger"))
}
