use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{LedgerError, LedgerResult};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> LedgerResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LedgerError::InvalidConfigValue {
            key: "logging.level".to_string(),
            message: e.to_string(),
        })?;

    let (json_layer, text_layer) = if config.json_format {
        (
            Some(fmt::layer().json().with_target(config.with_target)),
            None,
        )
    } else {
        (None, Some(fmt::layer().with_target(config.with_target)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| LedgerError::Config(format!("Failed to initialise logging: {}", e)))
}
