use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use common::{Graph, IndicatorKind, NodeKind, Params};

/// Best parameter set reported by the optimizer. Only the fields below are
/// written back into the graph; anything else the backend reports is kept
/// in `other` for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestParams {
    pub rsi_period: Option<f64>,
    pub sma_period: Option<f64>,
    pub supertrend_period: Option<f64>,
    pub supertrend_multiplier: Option<f64>,
    pub bb_period: Option<f64>,
    pub bb_std: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Write the optimizer's best parameters back into the matching nodes.
/// Absent and zero values leave the node untouched. Returns the number of
/// nodes changed.
pub fn apply_best_params(graph: &mut Graph, best: &BestParams) -> usize {
    let mut touched = 0;

    for node in &mut graph.nodes {
        let updates: Vec<(&str, Option<f64>)> = match &node.kind {
            NodeKind::Indicator { indicator, .. } => match indicator {
                IndicatorKind::Rsi => vec![("period", best.rsi_period)],
                IndicatorKind::MovingAverage => vec![("period", best.sma_period)],
                IndicatorKind::SuperTrend => vec![
                    ("period", best.supertrend_period),
                    ("multiplier", best.supertrend_multiplier),
                ],
                IndicatorKind::Bollinger => vec![("period", best.bb_period), ("std", best.bb_std)],
                IndicatorKind::Macd | IndicatorKind::Stochastic => vec![],
            },
            NodeKind::Order { .. } => vec![
                ("stop_loss", best.stop_loss),
                ("take_profit", best.take_profit),
            ],
            _ => vec![],
        };

        let Some(params) = node.kind.params_mut() else {
            continue;
        };
        if write_params(params, &updates) {
            touched += 1;
        }
    }

    info!(nodes = touched, "Applied optimization results");
    touched
}

fn write_params(params: &mut Params, updates: &[(&str, Option<f64>)]) -> bool {
    let mut changed = false;
    for (key, value) in updates {
        if let Some(v) = (*value).filter(|v| *v != 0.0 && v.is_finite()) {
            params.insert(key.to_string(), number(v));
            changed = true;
        }
    }
    changed
}

/// Whole numbers are stored as integers so periods stay integral.
fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}
