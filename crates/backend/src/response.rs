use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use strategy::BestParams;

/// Result of `/api/backtest`. Chart payloads are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestResult {
    pub profit_percent: f64,
    pub total_trades: u64,
    pub final_balance: f64,
    pub chart_data: Vec<Value>,
    pub markers: Vec<Value>,
    pub custom_plots: BTreeMap<String, Value>,
}

/// Result of `/api/optimize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationResult {
    pub best_profit: Option<f64>,
    pub best_params: BestParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backtest_result_tolerates_missing_chart_fields() {
        let result: BacktestResult = serde_json::from_value(json!({
            "profit_percent": 12.5,
            "total_trades": 8,
            "final_balance": 11250.0
        }))
        .unwrap();
        assert_eq!(result.total_trades, 8);
        assert!(result.chart_data.is_empty());
        assert!(result.custom_plots.is_empty());
    }

    #[test]
    fn optimization_result_keeps_unknown_params() {
        let result: OptimizationResult = serde_json::from_value(json!({
            "best_profit": 31.2,
            "best_params": { "rsi_period": 9, "macd_fast": 10 }
        }))
        .unwrap();
        assert_eq!(result.best_params.rsi_period, Some(9.0));
        assert_eq!(result.best_params.other["macd_fast"], json!(10));
    }
}
