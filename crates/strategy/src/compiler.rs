use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use common::{param_f64, Combinator, Graph, Node, NodeKind};

use crate::compiled::CompiledStrategy;
use crate::script;

/// Why a graph could not be turned into a strategy. Every variant is a
/// user-correctable mistake and its message is meant to be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Add a buy or sell order block to the strategy")]
    MissingOrderNode,

    #[error("Only one order block is allowed, found {}: {}", .labels.len(), .labels.join(", "))]
    MultipleOrderNodes { labels: Vec<String> },

    #[error("Connect an indicator or logic block to the order block '{label}'")]
    DisconnectedOrder { label: String },

    #[error(
        "The order block accepts exactly one incoming connection but has {count}; \
         route multiple indicators through a logic block first"
    )]
    MultipleOrderInputs { count: usize },

    #[error("A connection points at block '{id}', which does not exist")]
    UnknownNode { id: String },

    #[error("'{label}' cannot drive the order block; connect an indicator, script or logic block")]
    InvalidOrderInput { label: String },

    #[error("Logic block '{label}' has no inputs; connect at least one indicator to it")]
    EmptyLogicBlock { label: String },

    #[error("Logic block '{logic}' cannot take input from another logic or order block ('{label}')")]
    InvalidLogicInput { logic: String, label: String },

    #[error("These blocks are not connected to the strategy: {}", .labels.join(", "))]
    OrphanedNodes { labels: Vec<String> },
}

/// Turn a strategy graph into a flat strategy description.
///
/// The graph must contain exactly one order block with exactly one incoming
/// connection, from either a single indicator-like block or a logic block
/// fed by indicator-like blocks. Every indicator-like block in the graph must
/// be part of that chain.
///
/// Pure and deterministic: the graph is not modified and repeated calls on
/// the same graph return equal results.
pub fn compile(graph: &Graph) -> Result<CompiledStrategy, CompileError> {
    let order = locate_order(graph)?;
    let root = locate_root(graph, order)?;

    let (combinator, active) = match &root.kind {
        NodeKind::Logic { combinator } => (*combinator, logic_inputs(graph, root)?),
        kind if kind.is_indicator_like() => {
            (Combinator::And, HashSet::from([root.id.as_str()]))
        }
        _ => {
            return Err(CompileError::InvalidOrderInput {
                label: root.label.clone(),
            })
        }
    };

    let orphans: Vec<String> = graph
        .nodes
        .iter()
        .filter(|n| n.kind.is_indicator_like() && !active.contains(n.id.as_str()))
        .map(|n| n.label.clone())
        .collect();
    if !orphans.is_empty() {
        return Err(CompileError::OrphanedNodes { labels: orphans });
    }

    let mut strategy = CompiledStrategy {
        combinator,
        ..CompiledStrategy::default()
    };

    for node in graph.nodes.iter().filter(|n| active.contains(n.id.as_str())) {
        match &node.kind {
            NodeKind::Indicator { indicator, params } => {
                if strategy.has_block(*indicator) {
                    warn!(
                        label = %node.label,
                        indicator = %indicator,
                        "Duplicate indicator in strategy; only the first one is used"
                    );
                    continue;
                }
                strategy.set_block(*indicator, params);
            }
            NodeKind::CustomScript { script } | NodeKind::SavedScript { script, .. } => {
                strategy.custom_scripts.push(script::assemble(script));
            }
            _ => {}
        }
    }

    if let NodeKind::Order { side, params } = &order.kind {
        strategy.direction = side.direction();
        strategy.take_profit_percent = param_f64(params, "take_profit").unwrap_or(0.0);
        strategy.stop_loss_percent = param_f64(params, "stop_loss").unwrap_or(0.0);
    }

    debug!(
        combinator = %strategy.combinator,
        direction = %strategy.direction,
        indicators = strategy.indicator_count(),
        scripts = strategy.custom_scripts.len(),
        "Compiled strategy graph"
    );
    Ok(strategy)
}

fn locate_order(graph: &Graph) -> Result<&Node, CompileError> {
    let orders: Vec<&Node> = graph.order_nodes().collect();
    match orders.as_slice() {
        [] => Err(CompileError::MissingOrderNode),
        [order] => Ok(*order),
        many => Err(CompileError::MultipleOrderNodes {
            labels: many.iter().map(|n| n.label.clone()).collect(),
        }),
    }
}

fn locate_root<'a>(graph: &'a Graph, order: &'a Node) -> Result<&'a Node, CompileError> {
    // Repeated identical edges count once.
    let mut sources: Vec<&str> = Vec::new();
    for edge in graph.inbound(&order.id) {
        if !sources.contains(&edge.source.as_str()) {
            sources.push(&edge.source);
        }
    }
    match sources.as_slice() {
        [] => Err(CompileError::DisconnectedOrder {
            label: order.label.clone(),
        }),
        [source] => lookup(graph, source),
        many => Err(CompileError::MultipleOrderInputs { count: many.len() }),
    }
}

/// Sources of every edge into the logic block. Market inputs are accepted
/// and project to nothing; logic and order blocks cannot be nested.
fn logic_inputs<'a>(graph: &'a Graph, logic: &'a Node) -> Result<HashSet<&'a str>, CompileError> {
    let mut inputs = HashSet::new();
    for edge in graph.inbound(&logic.id) {
        let source = lookup(graph, &edge.source)?;
        if matches!(source.kind, NodeKind::Logic { .. } | NodeKind::Order { .. }) {
            return Err(CompileError::InvalidLogicInput {
                logic: logic.label.clone(),
                label: source.label.clone(),
            });
        }
        inputs.insert(source.id.as_str());
    }

    if inputs.is_empty() {
        return Err(CompileError::EmptyLogicBlock {
            label: logic.label.clone(),
        });
    }
    Ok(inputs)
}

fn lookup<'a>(graph: &'a Graph, id: &str) -> Result<&'a Node, CompileError> {
    graph
        .node(id)
        .ok_or_else(|| CompileError::UnknownNode { id: id.to_string() })
}
