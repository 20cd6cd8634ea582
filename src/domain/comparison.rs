//! Side-by-side comparison of several strategies on one price series.

use serde::Serialize;

use crate::domain::backtest::{BacktestConfig, StrategyRun, run_strategy};
use crate::domain::error::SigtestError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub strategy: String,
    pub params: StrategyParams,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub trade_count: usize,
    pub final_equity: f64,
}

impl From<&StrategyRun> for ComparisonEntry {
    fn from(run: &StrategyRun) -> Self {
        ComparisonEntry {
            strategy: run.strategy.clone(),
            params: run.params.clone(),
            total_return: run.metrics.total_return,
            sharpe_ratio: run.metrics.sharpe_ratio,
            max_drawdown: run.metrics.max_drawdown,
            calmar_ratio: run.metrics.calmar_ratio,
            trade_count: run.result.trade_count,
            final_equity: run.result.final_equity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Entries in input order.
    pub entries: Vec<ComparisonEntry>,
    /// Strategy names, best first.
    pub by_sharpe: Vec<String>,
    pub by_total_return: Vec<String>,
    pub by_calmar: Vec<String>,
    pub best: String,
}

/// Runs every parameter set through the full pipeline. Any failing strategy
/// fails the comparison.
pub fn compare_strategies(
    prices: &PriceSeries,
    strategies: &[StrategyParams],
    config: &BacktestConfig,
) -> Result<Comparison, SigtestError> {
    if strategies.is_empty() {
        return Err(SigtestError::configuration(
            "strategies",
            "at least one strategy is required",
        ));
    }

    let entries = strategies
        .iter()
        .map(|params| run_strategy(prices, params, config).map(|run| ComparisonEntry::from(&run)))
        .collect::<Result<Vec<_>, _>>()?;

    let by_sharpe = rank(&entries, |e| e.sharpe_ratio);
    let by_total_return = rank(&entries, |e| e.total_return);
    let by_calmar = rank(&entries, |e| e.calmar_ratio);
    let best = by_sharpe[0].clone();

    Ok(Comparison {
        entries,
        by_sharpe,
        by_total_return,
        by_calmar,
        best,
    })
}

fn rank(entries: &[ComparisonEntry], key: impl Fn(&ComparisonEntry) -> f64) -> Vec<String> {
    let mut order: Vec<&ComparisonEntry> = entries.iter().collect();
    order.sort_by(|a, b| key(b).total_cmp(&key(a)));
    order.into_iter().map(|e| e.strategy.clone()).collect()
}
