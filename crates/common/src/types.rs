use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Graph-unique node identifier.
pub type NodeId = String;

/// Free-form node parameters keyed by name. Values are JSON scalars; editors
/// commonly hand numbers over as strings, so readers accept both.
pub type Params = BTreeMap<String, Value>;

/// Indicator subtype. Fixed when the node is created; the label plays no part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    MovingAverage,
    Macd,
    Bollinger,
    SuperTrend,
    Stochastic,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 6] = [
        IndicatorKind::Rsi,
        IndicatorKind::MovingAverage,
        IndicatorKind::Macd,
        IndicatorKind::Bollinger,
        IndicatorKind::SuperTrend,
        IndicatorKind::Stochastic,
    ];

    /// Default display label for a freshly created node.
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::MovingAverage => "Moving Average",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Bollinger => "Bollinger Bands",
            IndicatorKind::SuperTrend => "SuperTrend",
            IndicatorKind::Stochastic => "Stochastic",
        }
    }

    /// Parameters a new node of this subtype starts with.
    pub fn default_params(&self) -> Params {
        let pairs: Vec<(&str, Value)> = match self {
            IndicatorKind::Rsi => vec![
                ("period", 14.into()),
                ("overbought", 70.into()),
                ("oversold", 30.into()),
                ("entry_operator", "<".into()),
                ("exit_operator", ">".into()),
            ],
            IndicatorKind::MovingAverage => vec![("period", 50.into()), ("ma_type", "SMA".into())],
            IndicatorKind::Macd => vec![
                ("fast", 12.into()),
                ("slow", 26.into()),
                ("signal", 9.into()),
            ],
            IndicatorKind::Bollinger => vec![("period", 20.into()), ("std", 2.into())],
            IndicatorKind::SuperTrend => vec![("period", 10.into()), ("multiplier", 3.into())],
            IndicatorKind::Stochastic => vec![
                ("k", 14.into()),
                ("d", 3.into()),
                ("oversold", 20.into()),
                ("overbought", 80.into()),
            ],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a logic block combines its input signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Combinator::And => write!(f, "AND"),
            Combinator::Or => write!(f, "OR"),
        }
    }
}

/// Side of the terminal order block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn direction(&self) -> Direction {
        match self {
            OrderSide::Buy => Direction::Long,
            OrderSide::Sell => Direction::Short,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy Order",
            OrderSide::Sell => "Sell Order",
        }
    }
}

/// Trade direction sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Threshold comparison used by RSI entry/exit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Below,
    #[serde(rename = ">")]
    Above,
}

impl CompareOp {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "<" => Some(CompareOp::Below),
            ">" => Some(CompareOp::Above),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Below => "<",
            CompareOp::Above => ">",
        }
    }
}

/// Moving-average flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaType {
    #[default]
    Sma,
    Ema,
}

impl MaType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SMA" => Some(MaType::Sma),
            "EMA" => Some(MaType::Ema),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaType::Sma => "SMA",
            MaType::Ema => "EMA",
        }
    }
}

/// One `name = value` override applied ahead of a script body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptParam {
    pub name: String,
    pub value: f64,
}

impl ScriptParam {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// User-authored micro-script attached to a script node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub body: String,
    /// Overrides in the order they are written ahead of the body.
    #[serde(default)]
    pub overrides: Vec<ScriptParam>,
}

impl Script {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            overrides: Vec::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<ScriptParam>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Kind-specific payload of a node. Only the fields a kind needs exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Price feed marker. Carries nothing and never enters a strategy.
    Input,
    Indicator {
        indicator: IndicatorKind,
        #[serde(default)]
        params: Params,
    },
    Logic {
        combinator: Combinator,
    },
    CustomScript {
        script: Script,
    },
    SavedScript {
        script_id: String,
        script: Script,
    },
    Order {
        side: OrderSide,
        #[serde(default)]
        params: Params,
    },
}

impl NodeKind {
    /// Indicator node preloaded with the subtype's default parameters.
    pub fn indicator(indicator: IndicatorKind) -> Self {
        NodeKind::Indicator {
            indicator,
            params: indicator.default_params(),
        }
    }

    /// Order node with take-profit and stop-loss disabled.
    pub fn order(side: OrderSide) -> Self {
        let params = [("stop_loss", 0), ("take_profit", 0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        NodeKind::Order { side, params }
    }

    pub fn logic(combinator: Combinator) -> Self {
        NodeKind::Logic { combinator }
    }

    /// Indicator, custom script and saved script nodes all produce a signal.
    pub fn is_indicator_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Indicator { .. } | NodeKind::CustomScript { .. } | NodeKind::SavedScript { .. }
        )
    }

    pub fn is_order(&self) -> bool {
        matches!(self, NodeKind::Order { .. })
    }

    pub fn script(&self) -> Option<&Script> {
        match self {
            NodeKind::CustomScript { script } | NodeKind::SavedScript { script, .. } => Some(script),
            _ => None,
        }
    }

    pub fn script_mut(&mut self) -> Option<&mut Script> {
        match self {
            NodeKind::CustomScript { script } | NodeKind::SavedScript { script, .. } => Some(script),
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&Params> {
        match self {
            NodeKind::Indicator { params, .. } | NodeKind::Order { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn params_mut(&mut self) -> Option<&mut Params> {
        match self {
            NodeKind::Indicator { params, .. } | NodeKind::Order { params, .. } => Some(params),
            _ => None,
        }
    }
}

/// A vertex of the strategy graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Display text only.
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }
}

/// Directed connection `source -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Read a numeric parameter. Numbers and numeric strings are accepted.
pub fn param_f64(params: &Params, key: &str) -> Option<f64> {
    value_f64(params.get(key)?)
}

/// A finite number, or a string holding one. `"inf"` and `"NaN"` are rejected.
pub fn value_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Read a string parameter.
pub fn param_str<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_f64_accepts_numeric_strings() {
        let mut params = Params::new();
        params.insert("period".into(), json!("21"));
        params.insert("std".into(), json!(2.5));
        params.insert("bad".into(), json!("abc"));
        params.insert("flag".into(), json!(true));

        assert_eq!(param_f64(&params, "period"), Some(21.0));
        assert_eq!(param_f64(&params, "std"), Some(2.5));
        assert_eq!(param_f64(&params, "bad"), None);
        assert_eq!(param_f64(&params, "flag"), None);
        assert_eq!(param_f64(&params, "missing"), None);
    }

    #[test]
    fn node_serializes_with_flat_kind_tag() {
        let node = Node::new("node_0", "RSI", NodeKind::indicator(IndicatorKind::Rsi));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"], "indicator");
        assert_eq!(value["indicator"], "rsi");
        assert_eq!(value["params"]["period"], 14);

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn order_node_parses_from_editor_json() {
        let node: Node = serde_json::from_value(json!({
            "id": "node_4",
            "label": "Sell Order",
            "kind": "order",
            "side": "sell",
            "params": { "take_profit": "5", "stop_loss": 2 }
        }))
        .unwrap();

        match &node.kind {
            NodeKind::Order { side, params } => {
                assert_eq!(side.direction(), Direction::Short);
                assert_eq!(param_f64(params, "take_profit"), Some(5.0));
            }
            other => panic!("expected order node, got {other:?}"),
        }
    }

    #[test]
    fn only_signal_nodes_are_indicator_like() {
        assert!(NodeKind::indicator(IndicatorKind::Macd).is_indicator_like());
        assert!(NodeKind::CustomScript { script: Script::new("x = 1") }.is_indicator_like());
        assert!(!NodeKind::logic(Combinator::Or).is_indicator_like());
        assert!(!NodeKind::order(OrderSide::Buy).is_indicator_like());
        assert!(!NodeKind::Input.is_indicator_like());
    }
}
