use serde::{Deserialize, Serialize};

use common::{
    param_f64, param_str, Combinator, CompareOp, Direction, IndicatorKind, MaType, Params,
};

/// Flat, backend-shaped result of compiling a strategy graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledStrategy {
    pub combinator: Combinator,
    pub direction: Direction,
    pub rsi: Option<RsiBlock>,
    pub moving_average: Option<MovingAverageBlock>,
    pub macd: Option<MacdBlock>,
    pub bollinger: Option<BollingerBlock>,
    pub supertrend: Option<SuperTrendBlock>,
    pub stochastic: Option<StochasticBlock>,
    /// Script bodies with their overrides already prepended.
    pub custom_scripts: Vec<String>,
    /// 0 disables take-profit.
    pub take_profit_percent: f64,
    /// 0 disables stop-loss.
    pub stop_loss_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiBlock {
    pub period: u32,
    pub oversold: f64,
    pub overbought: f64,
    pub entry_operator: CompareOp,
    pub exit_operator: CompareOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageBlock {
    pub period: u32,
    pub ma_type: MaType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdBlock {
    pub fast: u32,
    pub slow: u32,
    pub signal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBlock {
    pub period: u32,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperTrendBlock {
    pub period: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticBlock {
    pub k: u32,
    pub d: u32,
    pub oversold: f64,
    pub overbought: f64,
}

impl CompiledStrategy {
    /// Whether a block for `kind` has already been projected.
    pub fn has_block(&self, kind: IndicatorKind) -> bool {
        match kind {
            IndicatorKind::Rsi => self.rsi.is_some(),
            IndicatorKind::MovingAverage => self.moving_average.is_some(),
            IndicatorKind::Macd => self.macd.is_some(),
            IndicatorKind::Bollinger => self.bollinger.is_some(),
            IndicatorKind::SuperTrend => self.supertrend.is_some(),
            IndicatorKind::Stochastic => self.stochastic.is_some(),
        }
    }

    /// Number of indicator blocks present.
    pub fn indicator_count(&self) -> usize {
        IndicatorKind::ALL.iter().filter(|k| self.has_block(**k)).count()
    }

    /// Project an indicator node's parameters into its block. Missing or
    /// malformed parameters fall back to the subtype defaults.
    pub(crate) fn set_block(&mut self, kind: IndicatorKind, params: &Params) {
        match kind {
            IndicatorKind::Rsi => {
                self.rsi = Some(RsiBlock {
                    period: param_period(params, "period", 14),
                    oversold: param_or(params, "oversold", 30.0),
                    overbought: param_or(params, "overbought", 70.0),
                    entry_operator: param_op(params, "entry_operator", CompareOp::Below),
                    exit_operator: param_op(params, "exit_operator", CompareOp::Above),
                });
            }
            IndicatorKind::MovingAverage => {
                self.moving_average = Some(MovingAverageBlock {
                    period: param_period(params, "period", 50),
                    ma_type: param_str(params, "ma_type")
                        .and_then(MaType::parse)
                        .unwrap_or_default(),
                });
            }
            IndicatorKind::Macd => {
                self.macd = Some(MacdBlock {
                    fast: param_period(params, "fast", 12),
                    slow: param_period(params, "slow", 26),
                    signal: param_period(params, "signal", 9),
                });
            }
            IndicatorKind::Bollinger => {
                self.bollinger = Some(BollingerBlock {
                    period: param_period(params, "period", 20),
                    std: param_or(params, "std", 2.0),
                });
            }
            IndicatorKind::SuperTrend => {
                self.supertrend = Some(SuperTrendBlock {
                    period: param_period(params, "period", 10),
                    multiplier: param_or(params, "multiplier", 3.0),
                });
            }
            IndicatorKind::Stochastic => {
                self.stochastic = Some(StochasticBlock {
                    k: param_period(params, "k", 14),
                    d: param_period(params, "d", 3),
                    oversold: param_or(params, "oversold", 20.0),
                    overbought: param_or(params, "overbought", 80.0),
                });
            }
        }
    }
}

fn param_or(params: &Params, key: &str, default: f64) -> f64 {
    param_f64(params, key).unwrap_or(default)
}

fn param_period(params: &Params, key: &str, default: u32) -> u32 {
    param_f64(params, key)
        .filter(|v| *v >= 1.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32)
        .unwrap_or(default)
}

fn param_op(params: &Params, key: &str, default: CompareOp) -> CompareOp {
    param_str(params, key)
        .and_then(CompareOp::parse)
        .unwrap_or(default)
}
