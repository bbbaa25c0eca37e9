use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::{name_to_spec, AgentNetworkValidator, EMPTY_NETWORK_ERROR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Reports every cycle in the graph formed by agents' `tools` references.
///
/// References to tools that are not agents in the network are ignored.
#[derive(Debug, Default)]
pub struct CyclesNetworkValidator;

impl CyclesNetworkValidator {
    pub fn new() -> Self {
        Self
    }
}

fn build_graph(specs: &Map<String, Value>) -> BTreeMap<&str, Vec<&str>> {
    specs
        .iter()
        .map(|(name, spec)| {
            let edges = spec
                .get("tools")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .filter(|tool| specs.contains_key(*tool))
                .collect();
            (name.as_str(), edges)
        })
        .collect()
}

fn find_cycles<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    visits: &mut HashMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<&'a str>>,
) {
    visits.insert(node, Visit::InProgress);
    path.push(node);

    for &next in graph.get(node).into_iter().flatten() {
        match visits.get(next) {
            Some(Visit::InProgress) => {
                if let Some(start) = path.iter().position(|n| *n == next) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    cycles.push(cycle);
                }
            }
            Some(Visit::Done) => {}
            None => find_cycles(next, graph, visits, path, cycles),
        }
    }

    path.pop();
    visits.insert(node, Visit::Done);
}

impl AgentNetworkValidator for CyclesNetworkValidator {
    fn name(&self) -> &str {
        "cycles"
    }

    fn validate(&self, network: Option<&Value>) -> Vec<String> {
        debug!("Validating agent network for cycles");

        let specs = match network.and_then(name_to_spec) {
            Some(specs) if !specs.is_empty() => specs,
            _ => return vec![EMPTY_NETWORK_ERROR.to_string()],
        };

        let graph = build_graph(&specs);
        let mut visits = HashMap::new();
        let mut cycles = Vec::new();
        for &node in graph.keys() {
            if !visits.contains_key(node) {
                find_cycles(node, &graph, &mut visits, &mut Vec::new(), &mut cycles);
            }
        }

        let errors: Vec<String> = cycles
            .iter()
            .map(|cycle| format!("Cycle found in agent network: {}", cycle.join(" -> ")))
            .collect();

        if !errors.is_empty() {
            warn!(errors = ?errors, "Agent network cycle validation failed");
        }
        errors
    }
}
