//! Error types for the tokenledger core library.
//!
//! Every variant carries a stable code in its display text so log lines and
//! RPC error envelopes can be correlated.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E2001-E2099 | Config | Environment, config file, and validation errors |
//! | E3001-E3099 | LLM | Client factory, policy, and model request errors |
//! | E6001-E6099 | Accounting | Reporting sink and invocation lifecycle errors |
//! | E7001-E7099 | Cost | Pricing lookup errors |
//! | E9001-E9099 | General | Internal, IO, serialization, and validation errors |

use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// Context information for error tracking and debugging.
///
/// Captures the location where an error occurred along with an optional
/// operation description.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// File where the error occurred
    pub file: &'static str,
    /// Line number where the error occurred
    pub line: u32,
    /// Column number where the error occurred
    pub column: u32,
    /// Optional description of the operation being performed
    pub operation: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with the given location.
    pub fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            operation: None,
        }
    }

    /// Add an operation description to the context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)?;
        if let Some(ref op) = self.operation {
            write!(f, " ({})", op)?;
        }
        Ok(())
    }
}

/// Macro to create an ErrorContext at the current source location.
#[macro_export]
macro_rules! error_context {
    () => {
        $crate::error::ErrorContext::new(file!(), line!(), column!())
    };
    ($op:expr) => {
        $crate::error::ErrorContext::new(file!(), line!(), column!()).with_operation($op)
    };
}

/// The main error type for the tokenledger core library.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    /// Required environment variable is missing
    #[error("[E2001] Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Configuration file parse error
    #[error("[E2004] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// Invalid configuration value
    #[error("[E2005] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// Configuration error (generic)
    #[error("[E2006] Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // LLM Client Factory Errors (E3001-E3099)
    // ========================================================================
    /// The llm config names no class
    #[error("[E3001] Class name for model_name {model} is unspecified")]
    LlmClassUnspecified { model: String },

    /// The llm config names a class nobody knows about
    #[error("[E3002] Class {class} for model_name {model} is unrecognized")]
    LlmClassUnrecognized { class: String, model: String },

    /// A known provider class without a registered policy
    #[error("[E3003] No llm policy registered for provider '{0}'")]
    LlmPolicyNotRegistered(String),

    /// A second policy for the same provider
    #[error("[E3004] An llm policy is already registered for provider '{0}'")]
    LlmPolicyAlreadyRegistered(String),

    /// The provider rejected or failed a model request
    #[error("[E3005] Request to {provider} failed: {message}")]
    LlmRequestFailed { provider: String, message: String },

    /// Releasing a model's run-time resources failed
    #[error("[E3006] Failed to release llm resources: {0}")]
    LlmResourceRelease(String),

    // ========================================================================
    // Accounting Errors (E6001-E6099)
    // ========================================================================
    /// Writing an accounting record to the reporting sink failed
    #[error("[E6001] Failed to write accounting record: {0}")]
    SinkWriteFailed(String),

    /// The receiving end of the reporting sink is gone
    #[error("[E6002] Reporting sink is closed")]
    SinkClosed,

    /// Invalid invocation state transition
    #[error("[E6003] Invalid invocation state transition from {from} to {to}")]
    InvalidInvocationState { from: String, to: String },

    /// An invocation begun in one session was run against another
    #[error("[E6004] Invocation from session {invocation_session} run in session {session}")]
    ForeignInvocation {
        invocation_session: String,
        session: String,
    },

    /// Building a token accounting report failed
    #[error("[E6005] Failed to build token accounting report: {0}")]
    ReportFailed(String),

    // ========================================================================
    // Cost Errors (E7001-E7099)
    // ========================================================================
    /// Model pricing not found
    #[error("[E7001] Pricing not found for model '{model}' from provider '{provider}'")]
    ModelPricingNotFound { model: String, provider: String },

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal error (catch-all for unexpected conditions)
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    /// Validation error
    #[error("[E9004] Validation error: {0}")]
    ValidationError(String),

    /// IO error
    #[error("[E9005] IO error: {0}")]
    IoError(String),

    /// Serialization/deserialization error
    #[error("[E9006] Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for tokenledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => LedgerError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            config::ConfigError::FileParse { uri, cause } => LedgerError::ConfigParseError(
                format!("Failed to parse {}: {}", uri.unwrap_or_default(), cause),
            ),
            config::ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            } => LedgerError::InvalidConfigValue {
                key: key.unwrap_or_else(|| origin.map(|o| o.to_string()).unwrap_or_default()),
                message: format!("Expected {}, got {}", expected, unexpected),
            },
            _ => LedgerError::ConfigParseError(err.to_string()),
        }
    }
}

impl From<crate::config::ConfigLoadError> for LedgerError {
    fn from(err: crate::config::ConfigLoadError) -> Self {
        match err {
            crate::config::ConfigLoadError::Config(e) => e.into(),
            crate::config::ConfigLoadError::MissingRequired(key) => {
                LedgerError::InvalidConfigValue {
                    key,
                    message: "Missing required value".to_string(),
                }
            }
            crate::config::ConfigLoadError::InvalidValue { key, message } => {
                LedgerError::InvalidConfigValue { key, message }
            }
        }
    }
}

// ============================================================================
// Error categorization helpers
// ============================================================================

impl LedgerError {
    /// Returns true if this error is related to configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingEnvVar(_)
                | LedgerError::ConfigParseError(_)
                | LedgerError::InvalidConfigValue { .. }
                | LedgerError::Config(_)
        )
    }

    /// Returns true if this error came from the llm client factory or a model.
    pub fn is_llm_error(&self) -> bool {
        matches!(
            self,
            LedgerError::LlmClassUnspecified { .. }
                | LedgerError::LlmClassUnrecognized { .. }
                | LedgerError::LlmPolicyNotRegistered(_)
                | LedgerError::LlmPolicyAlreadyRegistered(_)
                | LedgerError::LlmRequestFailed { .. }
                | LedgerError::LlmResourceRelease(_)
        )
    }

    /// Returns true if this error is best-effort accounting telemetry.
    pub fn is_accounting_error(&self) -> bool {
        matches!(
            self,
            LedgerError::SinkWriteFailed(_)
                | LedgerError::SinkClosed
                | LedgerError::InvalidInvocationState { .. }
                | LedgerError::ForeignInvocation { .. }
                | LedgerError::ReportFailed(_)
        )
    }

    /// Returns true if this error is related to pricing.
    pub fn is_cost_error(&self) -> bool {
        matches!(self, LedgerError::ModelPricingNotFound { .. })
    }

    /// Returns an error code suitable for logging or external reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::MissingEnvVar(_) => "E2001",
            LedgerError::ConfigParseError(_) => "E2004",
            LedgerError::InvalidConfigValue { .. } => "E2005",
            LedgerError::Config(_) => "E2006",
            LedgerError::LlmClassUnspecified { .. } => "E3001",
            LedgerError::LlmClassUnrecognized { .. } => "E3002",
            LedgerError::LlmPolicyNotRegistered(_) => "E3003",
            LedgerError::LlmPolicyAlreadyRegistered(_) => "E3004",
            LedgerError::LlmRequestFailed { .. } => "E3005",
            LedgerError::LlmResourceRelease(_) => "E3006",
            LedgerError::SinkWriteFailed(_) => "E6001",
            LedgerError::SinkClosed => "E6002",
            LedgerError::InvalidInvocationState { .. } => "E6003",
            LedgerError::ForeignInvocation { .. } => "E6004",
            LedgerError::ReportFailed(_) => "E6005",
            LedgerError::ModelPricingNotFound { .. } => "E7001",
            LedgerError::Internal(_) => "E9001",
            LedgerError::ValidationError(_) => "E9004",
            LedgerError::IoError(_) => "E9005",
            LedgerError::SerializationError(_) => "E9006",
        }
    }

    /// Returns a user-friendly suggestion for how to resolve this error.
    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            LedgerError::MissingEnvVar(_) => {
                Some("Create a .env file or set the environment variable")
            }
            LedgerError::LlmClassUnspecified { .. } => {
                Some("Add a \"class\" key (e.g. \"openai\") to the llm config")
            }
            LedgerError::LlmClassUnrecognized { .. } => Some(
                "Use one of: openai, azure-openai, bedrock, anthropic, ollama, nvidia, gemini",
            ),
            LedgerError::LlmPolicyNotRegistered(_) => {
                Some("Register an llm policy for the provider before creating models")
            }
            LedgerError::ModelPricingNotFound { .. } => {
                Some("Add a [[pricing]] entry for the model to the configuration")
            }
            LedgerError::SinkClosed => {
                Some("The journal consumer stopped; accounting records are being dropped")
            }
            LedgerError::ForeignInvocation { .. } => {
                Some("Start invocations with count_tokens on a context of the same session")
            }
            _ => None,
        }
    }

    /// Log this error with appropriate severity level.
    ///
    /// Accounting errors are suppressed telemetry failures and log as warnings.
    pub fn log(&self) {
        let code = self.error_code();
        let suggestion = self.user_suggestion();

        if self.is_accounting_error() {
            warn!(
                error_code = %code,
                suggestion = suggestion,
                "Accounting error suppressed: {}",
                self
            );
        } else {
            error!(
                error_code = %code,
                suggestion = suggestion,
                "Error occurred: {}",
                self
            );
        }
    }

    /// Log this error with context information.
    pub fn log_with_context(&self, context: &ErrorContext) {
        let code = self.error_code();
        let suggestion = self.user_suggestion();

        if self.is_accounting_error() {
            warn!(
                error_code = %code,
                location = %context,
                suggestion = suggestion,
                "Accounting error suppressed at {}: {}",
                context,
                self
            );
        } else {
            error!(
                error_code = %code,
                location = %context,
                suggestion = suggestion,
                "Error at {}: {}",
                context,
                self
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::MissingEnvVar("OPENAI_API_KEY".to_string());
        assert!(err.to_string().contains("E2001"));
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = LedgerError::LlmClassUnrecognized {
            class: "foo".to_string(),
            model: "bar".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "[E3002] Class foo for model_name bar is unrecognized"
        );
    }

    #[test]
    fn test_error_categorization() {
        let config_err = LedgerError::MissingEnvVar("KEY".to_string());
        assert!(config_err.is_config_error());
        assert!(!config_err.is_llm_error());
        assert!(!config_err.is_accounting_error());

        let llm_err = LedgerError::LlmPolicyNotRegistered("gemini".to_string());
        assert!(llm_err.is_llm_error());
        assert!(!llm_err.is_config_error());

        assert!(LedgerError::SinkClosed.is_accounting_error());
        assert!(LedgerError::SinkWriteFailed("full".to_string()).is_accounting_error());

        assert!(LedgerError::ReportFailed("bad float".to_string()).is_accounting_error());
        assert!(LedgerError::ForeignInvocation {
            invocation_session: "a".to_string(),
            session: "b".to_string(),
        }
        .is_accounting_error());

        let cost_err = LedgerError::ModelPricingNotFound {
            model: "gpt-4o".to_string(),
            provider: "openai".to_string(),
        };
        assert!(cost_err.is_cost_error());
        assert!(!cost_err.is_accounting_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::Config("x".to_string()).error_code(), "E2006");
        assert_eq!(
            LedgerError::LlmClassUnspecified {
                model: "gpt-4o".to_string()
            }
            .error_code(),
            "E3001"
        );
        assert_eq!(LedgerError::SinkClosed.error_code(), "E6002");
        assert_eq!(
            LedgerError::ModelPricingNotFound {
                model: "gpt-4".to_string(),
                provider: "openai".to_string()
            }
            .error_code(),
            "E7001"
        );
        assert_eq!(LedgerError::Internal("err".to_string()).error_code(), "E9001");
    }

    #[test]
    fn test_user_suggestions() {
        assert!(LedgerError::MissingEnvVar("KEY".to_string())
            .user_suggestion()
            .is_some());
        assert!(LedgerError::SinkClosed.user_suggestion().is_some());
        assert!(LedgerError::Internal("err".to_string())
            .user_suggestion()
            .is_none());
    }

    #[test]
    fn test_error_context() {
        let ctx = ErrorContext::new("src/accounting/tracker.rs", 42, 10);
        assert_eq!(ctx.to_string(), "src/accounting/tracker.rs:42:10");

        let ctx_with_op = ctx.with_operation("write_message");
        assert_eq!(
            ctx_with_op.to_string(),
            "src/accounting/tracker.rs:42:10 (write_message)"
        );
    }

    #[test]
    fn test_error_context_macro() {
        let ctx = error_context!("flush");
        assert!(ctx.file.ends_with("error.rs"));
        assert_eq!(ctx.operation.as_deref(), Some("flush"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::IoError(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let err: LedgerError = json_result.unwrap_err().into();
        assert!(matches!(err, LedgerError::SerializationError(_)));
    }
}
