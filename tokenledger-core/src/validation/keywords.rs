use serde_json::Value;
use tracing::{debug, warn};

use super::{name_to_spec, AgentNetworkValidator, EMPTY_NETWORK_ERROR};

/// Checks that agents do not declare empty keyword values.
#[derive(Debug, Default)]
pub struct KeywordNetworkValidator;

impl KeywordNetworkValidator {
    pub fn new() -> Self {
        Self
    }
}

impl AgentNetworkValidator for KeywordNetworkValidator {
    fn name(&self) -> &str {
        "keywords"
    }

    fn validate(&self, network: Option<&Value>) -> Vec<String> {
        debug!("Validating agent network keywords");

        let Some(network) = network else {
            return vec![EMPTY_NETWORK_ERROR.to_string()];
        };

        let mut errors = Vec::new();
        for (agent_name, agent) in name_to_spec(network).unwrap_or_default() {
            if agent.get("instructions").and_then(Value::as_str) == Some("") {
                errors.push(format!("{} 'instructions' cannot be empty.", agent_name));
            }
        }

        if !errors.is_empty() {
            warn!(errors = ?errors, "Agent network keyword validation failed");
        }
        errors
    }
}
