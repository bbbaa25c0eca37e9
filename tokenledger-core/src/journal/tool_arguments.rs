use serde_json::{Map, Value};

use crate::models::{AgentMessage, Origin, ReportKind};

// Run-time handles that cannot be serialized for a remote journal.
const NON_TRANSFERABLE_KEYS: [&str; 2] = ["reservationist", "progress_reporter"];

/// Journal structure announcing that a tool is starting with `inputs`.
pub fn prepare_tool_start(
    inputs: &Map<String, Value>,
    origin: Option<&Origin>,
) -> Map<String, Value> {
    let mut tool_args = inputs.clone();

    if let Some(origin) = origin {
        tool_args.insert(
            "origin".to_string(),
            Value::Array(
                origin
                    .names()
                    .iter()
                    .map(|name| Value::String(name.clone()))
                    .collect(),
            ),
        );
        tool_args.insert("origin_str".to_string(), Value::String(origin.full_name()));
    }

    for key in NON_TRANSFERABLE_KEYS {
        tool_args.remove(key);
    }

    let mut structure = Map::new();
    structure.insert("tool_start".to_string(), Value::Bool(true));
    structure.insert("tool_args".to_string(), Value::Object(tool_args));
    structure
}

pub fn tool_start_message(inputs: &Map<String, Value>, origin: &Origin) -> AgentMessage {
    AgentMessage::new(
        origin.clone(),
        ReportKind::ToolStart,
        prepare_tool_start(inputs, Some(origin)),
    )
}
