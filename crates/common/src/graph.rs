use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{value_f64, Edge, Node, NodeId, NodeKind, ScriptParam};

/// Rejections raised while the graph is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Only one order block is allowed; '{existing}' is already in the strategy")]
    DuplicateOrderNode { existing: String },

    #[error("A block cannot be connected to itself ('{id}')")]
    SelfLoop { id: NodeId },

    #[error("No block with id '{id}' exists")]
    UnknownNode { id: NodeId },

    #[error("Block '{label}' has no parameter named '{name}'")]
    UnknownParameter { label: String, name: String },
}

/// The full set of nodes and edges of one strategy.
///
/// Node ids are allocated per graph instance as `node_<n>`; the counter is
/// not persisted and skips ids already present after a reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(skip)]
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing snapshot without re-validating it. The compiler is
    /// the authority on structural correctness.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            next_id: 0,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn order_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind.is_order())
    }

    /// Edges whose target is `id`, in insertion order.
    pub fn inbound<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Add a node and return its freshly allocated id.
    pub fn add_node(&mut self, label: impl Into<String>, kind: NodeKind) -> Result<NodeId, GraphError> {
        if kind.is_order() {
            if let Some(existing) = self.order_nodes().next() {
                return Err(GraphError::DuplicateOrderNode {
                    existing: existing.label.clone(),
                });
            }
        }

        let id = self.allocate_id();
        self.nodes.push(Node::new(id.clone(), label, kind));
        Ok(id)
    }

    fn allocate_id(&mut self) -> NodeId {
        loop {
            let candidate = format!("node_{}", self.next_id);
            self.next_id += 1;
            if self.node(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Connect `source -> target`. Returns `false` when the edge already exists.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<bool, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop { id: source.to_string() });
        }
        for id in [source, target] {
            if self.node(id).is_none() {
                return Err(GraphError::UnknownNode { id: id.to_string() });
            }
        }
        if self.edges.iter().any(|e| e.source == source && e.target == target) {
            return Ok(false);
        }
        self.edges.push(Edge::new(source, target));
        Ok(true)
    }

    /// Remove the edge `source -> target`. Returns whether anything was removed.
    pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| !(e.source == source && e.target == target));
        self.edges.len() != before
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(self.nodes.remove(idx))
    }

    /// Set a parameter on an indicator/order node, or a script override on a
    /// script node. Script overrides must already exist by name.
    pub fn set_param(&mut self, id: &str, name: &str, value: Value) -> Result<(), GraphError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::UnknownNode { id: id.to_string() })?;

        if let Some(params) = node.kind.params_mut() {
            params.insert(name.to_string(), value);
            return Ok(());
        }

        if let (Some(script), Some(v)) = (node.kind.script_mut(), value_f64(&value)) {
            if let Some(param) = script.overrides.iter_mut().find(|p| p.name == name) {
                param.value = v;
                return Ok(());
            }
        }

        Err(GraphError::UnknownParameter {
            label: node.label.clone(),
            name: name.to_string(),
        })
    }

    /// Drop every node instantiated from a deleted library script.
    pub fn remove_script_nodes(&mut self, script_id: &str) -> usize {
        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| matches!(&n.kind, NodeKind::SavedScript { script_id: sid, .. } if sid == script_id))
            .map(|n| n.id.clone())
            .collect();
        for id in &ids {
            self.remove_node(id);
        }
        ids.len()
    }

    /// Replace code, overrides and label of every node instantiated from a
    /// library script that was updated or overwritten.
    pub fn refresh_script_nodes(
        &mut self,
        script_id: &str,
        label: &str,
        code: &str,
        params: &[ScriptParam],
    ) -> usize {
        let mut refreshed = 0;
        for node in &mut self.nodes {
            if let NodeKind::SavedScript { script_id: sid, script } = &mut node.kind {
                if sid == script_id {
                    script.body = code.to_string();
                    script.overrides = params.to_vec();
                    node.label = label.to_string();
                    refreshed += 1;
                }
            }
        }
        refreshed
    }

    /// Relabel every node instantiated from a renamed library script.
    pub fn rename_script_nodes(&mut self, script_id: &str, label: &str) -> usize {
        let mut renamed = 0;
        for node in &mut self.nodes {
            if matches!(&node.kind, NodeKind::SavedScript { script_id: sid, .. } if sid == script_id) {
                node.label = label.to_string();
                renamed += 1;
            }
        }
        renamed
    }
}
