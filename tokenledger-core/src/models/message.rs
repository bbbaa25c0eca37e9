use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Usage counted for a single agent invocation.
    InvocationAccounting,
    /// Network totals for the last root invocation.
    Network,
    /// Per-model usage for the last root invocation.
    Models,
    /// Network totals since the session began.
    CumulativeNetwork,
    /// Per-model usage since the session began.
    CumulativeModels,
    ToolStart,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::InvocationAccounting => write!(f, "invocation_accounting"),
            ReportKind::Network => write!(f, "network"),
            ReportKind::Models => write!(f, "models"),
            ReportKind::CumulativeNetwork => write!(f, "cumulative_network"),
            ReportKind::CumulativeModels => write!(f, "cumulative_models"),
            ReportKind::ToolStart => write!(f, "tool_start"),
        }
    }
}

/// A structured record written to a reporting sink on behalf of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: Uuid,
    pub agent_name: String,
    pub origin: Origin,
    pub kind: ReportKind,
    pub structure: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(origin: Origin, kind: ReportKind, structure: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_name: origin.agent_name().to_string(),
            origin,
            kind,
            structure,
            timestamp: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.structure.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_kind_display() {
        assert_eq!(ReportKind::InvocationAccounting.to_string(), "invocation_accounting");
        assert_eq!(ReportKind::CumulativeModels.to_string(), "cumulative_models");
        assert_eq!(
            serde_json::to_value(ReportKind::CumulativeNetwork).unwrap(),
            json!("cumulative_network")
        );
    }

    #[test]
    fn test_agent_message_new() {
        let mut structure = Map::new();
        structure.insert("tool_start".to_string(), json!(true));

        let message = AgentMessage::new(
            Origin::new(["frontman", "searcher"]),
            ReportKind::ToolStart,
            structure,
        );

        assert_eq!(message.agent_name, "searcher");
        assert_eq!(message.get("tool_start"), Some(&json!(true)));
        assert!(message.get("missing").is_none());
    }
}
