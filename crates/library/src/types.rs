use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Edge, Graph, Node, NodeKind, Script, ScriptParam};

/// Persisted form of an editing session: the graph plus the editor's
/// current script text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub script_text: String,
}

impl StrategySnapshot {
    pub fn from_graph(graph: &Graph, script_text: impl Into<String>) -> Self {
        Self {
            nodes: graph.nodes.clone(),
            edges: graph.edges.clone(),
            script_text: script_text.into(),
        }
    }

    pub fn into_graph(self) -> Graph {
        Graph::from_parts(self.nodes, self.edges)
    }
}

/// Listing entry for a saved strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub id: String,
    pub name: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStrategy {
    pub id: String,
    pub name: String,
    pub snapshot: StrategySnapshot,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScript {
    pub id: String,
    pub name: String,
    pub code: String,
    /// Constant assignments found in `code`, used as the node's default overrides.
    pub params: Vec<ScriptParam>,
    pub saved_at: DateTime<Utc>,
}

impl SavedScript {
    /// Node payload for placing this script into a graph.
    pub fn node_kind(&self) -> NodeKind {
        NodeKind::SavedScript {
            script_id: self.id.clone(),
            script: Script::new(self.code.clone()).with_overrides(self.params.clone()),
        }
    }

    /// Bring graph nodes built from this script up to date with its current
    /// name, code and params.
    pub fn refresh_nodes(&self, graph: &mut Graph) -> usize {
        graph.refresh_script_nodes(&self.id, &self.name, &self.code, &self.params)
    }
}
