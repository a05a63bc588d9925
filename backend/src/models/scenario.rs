use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend scenario identifier (e.g. `sc_12`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new(value: impl Into<String>) -> Self {
        ScenarioId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        ScenarioId(value.to_string())
    }
}

impl From<String> for ScenarioId {
    fn from(value: String) -> Self {
        ScenarioId(value)
    }
}

/// Whether the current selection identifies one scenario or a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    Single,
    Multi,
}

impl ScenarioMode {
    pub fn from_count(count: usize) -> Self {
        if count == 1 {
            ScenarioMode::Single
        } else {
            ScenarioMode::Multi
        }
    }
}

/// Outcome of resolving a filter set against the matched scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub mode: ScenarioMode,
    /// Present in single-scenario mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_scenario: Option<ScenarioId>,
    pub count: usize,
}
