use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered agent names from the root of a call chain to the current agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(Vec<String>);

impl Origin {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn root(agent_name: impl Into<String>) -> Self {
        Self(vec![agent_name.into()])
    }

    /// This path extended by one more agent.
    pub fn child(&self, agent_name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(agent_name.into());
        Self(names)
    }

    pub fn full_name(&self) -> String {
        self.0.join(".")
    }

    /// The last agent in the path, or "" for an empty path.
    pub fn agent_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
