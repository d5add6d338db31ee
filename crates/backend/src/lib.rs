pub mod client;
pub mod request;
pub mod response;

pub use client::{HttpBackend, StrategyBackend};
pub use request::BacktestRequest;
pub use response::{BacktestResult, OptimizationResult};

use tracing::info;

use common::{Error, Result, RunSettings};
use strategy::CompiledStrategy;

/// Backtest a compiled strategy over the given market and date range.
pub async fn run_backtest(
    backend: &dyn StrategyBackend,
    strategy: &CompiledStrategy,
    settings: &RunSettings,
) -> Result<BacktestResult> {
    let request = BacktestRequest::new(strategy, settings);
    info!(
        symbol = %request.symbol,
        timeframe = %request.timeframe,
        logic = %request.strategy_logic,
        direction = %request.trade_direction,
        scripts = request.custom_indicators.len(),
        "Running backtest"
    );
    let result = backend.backtest(&request).await?;
    info!(
        profit_pct = result.profit_percent,
        trades = result.total_trades,
        "Backtest finished"
    );
    Ok(result)
}

/// Optimize a compiled strategy. Scripted strategies cannot be optimized by
/// the backend and are refused before any request is made.
pub async fn run_optimization(
    backend: &dyn StrategyBackend,
    strategy: &CompiledStrategy,
    settings: &RunSettings,
) -> Result<OptimizationResult> {
    if !strategy.custom_scripts.is_empty() {
        return Err(Error::Unsupported(
            "optimization is not available for strategies that contain script blocks".into(),
        ));
    }

    let request = BacktestRequest::new(strategy, settings);
    info!(
        symbol = %request.symbol,
        timeframe = %request.timeframe,
        logic = %request.strategy_logic,
        "Running optimization"
    );
    let result = backend.optimize(&request).await?;
    info!(best_profit = ?result.best_profit, "Optimization finished");
    Ok(result)
}
