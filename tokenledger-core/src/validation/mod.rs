//! Structural checks on agent network definitions.
//!
//! Validators return a list of human-readable problems; an empty list means
//! the network passed.

mod cycles;
mod keywords;

pub use cycles::CyclesNetworkValidator;
pub use keywords::KeywordNetworkValidator;

use serde_json::{Map, Value};

use crate::error::{LedgerError, LedgerResult};

pub const EMPTY_NETWORK_ERROR: &str = "Agent network is empty.";

pub trait AgentNetworkValidator: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, network: Option<&Value>) -> Vec<String>;

    /// Collapse the problem list into a single validation error.
    fn check(&self, network: Option<&Value>) -> LedgerResult<()> {
        let errors = self.validate(network);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::ValidationError(errors.join(" ")))
        }
    }
}

/// Agent name to agent spec.
///
/// A network with a `tools` list is indexed by each entry's `name`; any other
/// object is taken to already be that mapping. Returns `None` for non-objects.
pub fn name_to_spec(network: &Value) -> Option<Map<String, Value>> {
    let object = network.as_object()?;

    let Some(tools) = object.get("tools") else {
        return Some(object.clone());
    };

    let mut specs = Map::new();
    for agent in tools.as_array().into_iter().flatten() {
        if let Some(name) = agent.get("name").and_then(Value::as_str) {
            specs.insert(name.to_string(), agent.clone());
        }
    }
    Some(specs)
}

/// Runs several validators and concatenates their findings.
#[derive(Default)]
pub struct CompositeNetworkValidator {
    validators: Vec<Box<dyn AgentNetworkValidator>>,
}

impl CompositeNetworkValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword and cycle checks.
    pub fn standard() -> Self {
        Self::new()
            .with(KeywordNetworkValidator::new())
            .with(CyclesNetworkValidator::new())
    }

    pub fn with(mut self, validator: impl AgentNetworkValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl AgentNetworkValidator for CompositeNetworkValidator {
    fn name(&self) -> &str {
        "composite"
    }

    fn validate(&self, network: Option<&Value>) -> Vec<String> {
        self.validators
            .iter()
            .flat_map(|validator| validator.validate(network))
            .collect()
    }
}
