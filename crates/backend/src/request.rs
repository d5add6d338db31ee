use serde::{Deserialize, Serialize};

use common::{Combinator, Direction, RunSettings};
use strategy::CompiledStrategy;

/// Request body for `/api/backtest` and `/api/optimize`.
///
/// Field names are the backend's wire contract. An indicator that is not
/// part of the strategy is sent with period 0 (disabled) and the backend's
/// neutral values for its other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: String,
    pub end_date: String,
    pub strategy_logic: Combinator,
    pub trade_direction: Direction,
    /// Always empty; scripts travel in `custom_indicators`.
    pub custom_code: String,
    pub custom_indicators: Vec<String>,
    pub rsi_period: u32,
    pub overbought: f64,
    pub oversold: f64,
    pub entry_operator: String,
    pub exit_operator: String,
    pub sma_period: u32,
    pub ma_type: String,
    pub macd_fast: u32,
    pub macd_slow: u32,
    pub macd_signal: u32,
    pub bb_period: u32,
    pub bb_std: f64,
    pub supertrend_period: u32,
    pub supertrend_multiplier: f64,
    pub stoch_k: u32,
    pub stoch_d: u32,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl BacktestRequest {
    pub fn new(strategy: &CompiledStrategy, settings: &RunSettings) -> Self {
        let rsi = strategy.rsi.as_ref();
        let ma = strategy.moving_average.as_ref();
        let macd = strategy.macd.as_ref();
        let bb = strategy.bollinger.as_ref();
        let st = strategy.supertrend.as_ref();
        let stoch = strategy.stochastic.as_ref();

        Self {
            symbol: settings.symbol.clone(),
            timeframe: settings.timeframe.clone(),
            start_date: settings.start_date.clone(),
            end_date: settings.end_date.clone(),
            strategy_logic: strategy.combinator,
            trade_direction: strategy.direction,
            custom_code: String::new(),
            custom_indicators: strategy.custom_scripts.clone(),
            rsi_period: rsi.map_or(0, |b| b.period),
            overbought: rsi.map_or(70.0, |b| b.overbought),
            oversold: rsi.map_or(30.0, |b| b.oversold),
            entry_operator: rsi.map_or("<", |b| b.entry_operator.as_str()).to_string(),
            exit_operator: rsi.map_or(">", |b| b.exit_operator.as_str()).to_string(),
            sma_period: ma.map_or(0, |b| b.period),
            ma_type: ma.map_or("SMA", |b| b.ma_type.as_str()).to_string(),
            macd_fast: macd.map_or(0, |b| b.fast),
            macd_slow: macd.map_or(26, |b| b.slow),
            macd_signal: macd.map_or(9, |b| b.signal),
            bb_period: bb.map_or(0, |b| b.period),
            bb_std: bb.map_or(2.0, |b| b.std),
            supertrend_period: st.map_or(0, |b| b.period),
            supertrend_multiplier: st.map_or(3.0, |b| b.multiplier),
            stoch_k: stoch.map_or(0, |b| b.k),
            stoch_d: stoch.map_or(3, |b| b.d),
            stoch_oversold: stoch.map_or(20.0, |b| b.oversold),
            stoch_overbought: stoch.map_or(80.0, |b| b.overbought),
            stop_loss: strategy.stop_loss_percent,
            take_profit: strategy.take_profit_percent,
        }
    }
}
