//! Grid search over strategy parameters.
//!
//! Every combination runs the full signals, backtest and metrics pipeline.
//! Combinations are evaluated in parallel; a combination that fails is logged
//! and left out of the ranking instead of aborting the search.

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::domain::backtest::{BacktestConfig, run_strategy};
use crate::domain::error::SigtestError;
use crate::domain::metrics::{METRIC_NAMES, Metrics};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::{StrategyKind, StrategyParams};

pub const DEFAULT_TARGET_METRIC: &str = "sharpe_ratio";
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerConfig {
    pub target_metric: String,
    pub target_value: Option<f64>,
    pub max_iterations: usize,
    pub top_k: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            target_metric: DEFAULT_TARGET_METRIC.to_string(),
            target_value: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), SigtestError> {
        if !METRIC_NAMES.contains(&self.target_metric.as_str()) {
            return Err(SigtestError::configuration(
                "target_metric",
                format!(
                    "unknown metric '{}', expected one of: {}",
                    self.target_metric,
                    METRIC_NAMES.join(", ")
                ),
            ));
        }
        if self.max_iterations == 0 {
            return Err(SigtestError::configuration(
                "max_iterations",
                "must be positive",
            ));
        }
        if self.top_k == 0 {
            return Err(SigtestError::configuration("top_k", "must be positive"));
        }
        Ok(())
    }

    fn lower_is_better(&self) -> bool {
        self.target_metric == "max_drawdown"
    }

    /// Drawdown targets are met by staying under the target in absolute
    /// value; every other metric by reaching it.
    fn is_met(&self, score: f64) -> bool {
        match self.target_value {
            Some(target) if self.lower_is_better() => score.abs() < target,
            Some(target) => score >= target,
            None => false,
        }
    }
}

/// Candidate values per parameter for one strategy family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterGrid {
    SmaCrossover {
        short_windows: Vec<usize>,
        long_windows: Vec<usize>,
    },
    Rsi {
        periods: Vec<usize>,
        lower_thresholds: Vec<f64>,
        upper_thresholds: Vec<f64>,
    },
    Bollinger {
        periods: Vec<usize>,
        std_dev_multipliers: Vec<f64>,
    },
    Macd {
        fast_spans: Vec<usize>,
        slow_spans: Vec<usize>,
        signal_spans: Vec<usize>,
    },
}

impl ParameterGrid {
    /// The stock grid for a family; buy-and-hold has nothing to tune.
    pub fn default_for(kind: StrategyKind) -> Option<Self> {
        let grid = match kind {
            StrategyKind::SmaCrossover => ParameterGrid::SmaCrossover {
                short_windows: vec![5, 10, 15, 20, 25, 30],
                long_windows: vec![30, 40, 50, 60, 70, 100],
            },
            StrategyKind::Rsi => ParameterGrid::Rsi {
                periods: vec![7, 14, 21, 28],
                lower_thresholds: vec![20.0, 25.0, 30.0, 35.0],
                upper_thresholds: vec![65.0, 70.0, 75.0, 80.0],
            },
            StrategyKind::Bollinger => ParameterGrid::Bollinger {
                periods: vec![10, 15, 20, 25, 30],
                std_dev_multipliers: vec![1.5, 2.0, 2.5, 3.0],
            },
            StrategyKind::Macd => ParameterGrid::Macd {
                fast_spans: vec![8, 12, 16],
                slow_spans: vec![21, 26, 32],
                signal_spans: vec![7, 9, 11],
            },
            StrategyKind::BuyAndHold => return None,
        };
        Some(grid)
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            ParameterGrid::SmaCrossover { .. } => StrategyKind::SmaCrossover,
            ParameterGrid::Rsi { .. } => StrategyKind::Rsi,
            ParameterGrid::Bollinger { .. } => StrategyKind::Bollinger,
            ParameterGrid::Macd { .. } => StrategyKind::Macd,
        }
    }

    /// Cartesian product in grid order, minus combinations whose ordered
    /// pair is inverted (short >= long, lower >= upper, fast >= slow).
    pub fn combinations(&self) -> Vec<StrategyParams> {
        match self {
            ParameterGrid::SmaCrossover {
                short_windows,
                long_windows,
            } => short_windows
                .iter()
                .flat_map(|&short_window| {
                    long_windows
                        .iter()
                        .filter(move |&&long_window| short_window < long_window)
                        .map(move |&long_window| StrategyParams::SmaCrossover {
                            short_window,
                            long_window,
                        })
                })
                .collect(),
            ParameterGrid::Rsi {
                periods,
                lower_thresholds,
                upper_thresholds,
            } => {
                let mut out = Vec::new();
                for &period in periods {
                    for &lower_threshold in lower_thresholds {
                        for &upper_threshold in upper_thresholds {
                            if lower_threshold < upper_threshold {
                                out.push(StrategyParams::Rsi {
                                    period,
                                    lower_threshold,
                                    upper_threshold,
                                });
                            }
                        }
                    }
                }
                out
            }
            ParameterGrid::Bollinger {
                periods,
                std_dev_multipliers,
            } => periods
                .iter()
                .flat_map(|&period| {
                    std_dev_multipliers
                        .iter()
                        .map(move |&std_dev_multiplier| StrategyParams::Bollinger {
                            period,
                            std_dev_multiplier,
                        })
                })
                .collect(),
            ParameterGrid::Macd {
                fast_spans,
                slow_spans,
                signal_spans,
            } => {
                let mut out = Vec::new();
                for &fast_span in fast_spans {
                    for &slow_span in slow_spans {
                        if fast_span >= slow_span {
                            continue;
                        }
                        for &signal_span in signal_spans {
                            out.push(StrategyParams::Macd {
                                fast_span,
                                slow_span,
                                signal_span,
                            });
                        }
                    }
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRun {
    pub strategy: String,
    pub params: StrategyParams,
    pub score: f64,
    pub metrics: Metrics,
    pub trade_count: usize,
    pub final_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub strategy: &'static str,
    pub target_metric: String,
    pub target_value: Option<f64>,
    pub best: RankedRun,
    /// Top results, best first.
    pub results: Vec<RankedRun>,
    /// Combinations that completed.
    pub total_tested: usize,
    /// Combinations that failed and were left out.
    pub skipped: usize,
    pub target_met: bool,
}

pub fn optimize(
    prices: &PriceSeries,
    grid: &ParameterGrid,
    backtest: &BacktestConfig,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, SigtestError> {
    config.validate()?;
    backtest.validate()?;

    let mut combinations = grid.combinations();
    if combinations.is_empty() {
        return Err(SigtestError::configuration(
            "grid",
            format!("no valid {} parameter combinations", grid.kind()),
        ));
    }
    combinations.truncate(config.max_iterations);
    let attempted = combinations.len();

    let mut ranked: Vec<RankedRun> = combinations
        .par_iter()
        .filter_map(|params| match run_strategy(prices, params, backtest) {
            Ok(run) => {
                let score = run.metrics.get(&config.target_metric)?;
                Some(RankedRun {
                    strategy: run.strategy,
                    params: run.params,
                    score,
                    metrics: run.metrics,
                    trade_count: run.result.trade_count,
                    final_equity: run.result.final_equity,
                })
            }
            Err(e) => {
                warn!(params = %params, error = %e, "Skipping parameter combination");
                None
            }
        })
        .collect();

    if config.lower_is_better() {
        ranked.sort_by(|a, b| a.score.abs().total_cmp(&b.score.abs()));
    } else {
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    let total_tested = ranked.len();
    ranked.truncate(config.top_k);
    let Some(best) = ranked.first().cloned() else {
        return Err(SigtestError::configuration(
            "grid",
            format!(
                "none of the {attempted} {} parameter combinations could be evaluated",
                grid.kind()
            ),
        ));
    };

    Ok(OptimizationReport {
        strategy: grid.kind().as_str(),
        target_metric: config.target_metric.clone(),
        target_value: config.target_value,
        target_met: config.is_met(best.score),
        best,
        results: ranked,
        total_tested,
        skipped: attempted - total_tested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wave_series(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + 0.1 * i as f64 + 12.0 * (i as f64 / 11.0).sin())
            .collect();
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), &closes).unwrap()
    }

    #[test]
    fn sma_grid_filters_inverted_pairs() {
        let grid = ParameterGrid::default_for(StrategyKind::SmaCrossover).unwrap();
        let combos = grid.combinations();
        // 6x6 minus the (30, 30) pair
        assert_eq!(combos.len(), 35);
        assert!(combos.iter().all(|p| matches!(
            p,
            StrategyParams::SmaCrossover { short_window, long_window } if short_window < long_window
        )));
        assert_eq!(
            combos[0],
            StrategyParams::SmaCrossover {
                short_window: 5,
                long_window: 30
            }
        );
    }

    #[test]
    fn default_grid_sizes() {
        let size = |kind| ParameterGrid::default_for(kind).unwrap().combinations().len();
        assert_eq!(size(StrategyKind::Rsi), 64);
        assert_eq!(size(StrategyKind::Bollinger), 20);
        assert_eq!(size(StrategyKind::Macd), 27);
        assert!(ParameterGrid::default_for(StrategyKind::BuyAndHold).is_none());
    }

    #[test]
    fn macd_grid_drops_fast_not_below_slow() {
        let grid = ParameterGrid::Macd {
            fast_spans: vec![5, 30],
            slow_spans: vec![20],
            signal_spans: vec![9],
        };
        assert_eq!(grid.combinations().len(), 1);
    }

    #[test]
    fn config_validation() {
        assert!(OptimizerConfig::default().validate().is_ok());
        let bad_metric = OptimizerConfig {
            target_metric: "alpha".into(),
            ..OptimizerConfig::default()
        };
        assert!(bad_metric.validate().is_err());
        let zero_k = OptimizerConfig {
            top_k: 0,
            ..OptimizerConfig::default()
        };
        assert!(zero_k.validate().is_err());
    }

    #[test]
    fn results_sorted_descending_and_truncated() {
        let prices = wave_series(300);
        let grid = ParameterGrid::default_for(StrategyKind::SmaCrossover).unwrap();
        let config = OptimizerConfig {
            max_iterations: 12,
            top_k: 5,
            ..OptimizerConfig::default()
        };
        let report = optimize(&prices, &grid, &BacktestConfig::default(), &config).unwrap();
        assert_eq!(report.total_tested, 12);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.results.len(), 5);
        for pair in report.results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(report.best, report.results[0]);
        assert_eq!(report.best.score, report.best.metrics.sharpe_ratio);
    }

    #[test]
    fn drawdown_ranks_by_smallest_magnitude() {
        let prices = wave_series(300);
        let grid = ParameterGrid::default_for(StrategyKind::Bollinger).unwrap();
        let config = OptimizerConfig {
            target_metric: "max_drawdown".into(),
            target_value: Some(1.0),
            ..OptimizerConfig::default()
        };
        let report = optimize(&prices, &grid, &BacktestConfig::default(), &config).unwrap();
        for pair in report.results.windows(2) {
            assert!(pair[0].score.abs() <= pair[1].score.abs());
        }
        // every drawdown is smaller than 100%
        assert!(report.target_met);
    }

    #[test]
    fn failing_combinations_are_skipped() {
        let prices = wave_series(120);
        let grid = ParameterGrid::Rsi {
            periods: vec![14],
            // 45 breaks the lower threshold limit
            lower_thresholds: vec![30.0, 45.0],
            upper_thresholds: vec![70.0],
        };
        let report = optimize(&prices, &grid, &BacktestConfig::default(), &OptimizerConfig::default())
            .unwrap();
        assert_eq!(report.total_tested, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn all_failing_is_an_error() {
        let prices = wave_series(50);
        let grid = ParameterGrid::Bollinger {
            periods: vec![1],
            std_dev_multipliers: vec![2.0],
        };
        let err = optimize(&prices, &grid, &BacktestConfig::default(), &OptimizerConfig::default())
            .unwrap_err();
        assert!(matches!(err, SigtestError::Configuration { .. }));
    }

    #[test]
    fn repeatable() {
        let prices = wave_series(200);
        let grid = ParameterGrid::default_for(StrategyKind::Macd).unwrap();
        let config = OptimizerConfig::default();
        let a = optimize(&prices, &grid, &BacktestConfig::default(), &config).unwrap();
        let b = optimize(&prices, &grid, &BacktestConfig::default(), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn target_rules() {
        let config = OptimizerConfig {
            target_value: Some(1.5),
            ..OptimizerConfig::default()
        };
        assert!(config.is_met(1.5));
        assert!(!config.is_met(1.49));
        let dd = OptimizerConfig {
            target_metric: "max_drawdown".into(),
            target_value: Some(0.15),
            ..OptimizerConfig::default()
        };
        assert!(dd.is_met(-0.1));
        assert!(!dd.is_met(-0.2));
        assert!(!OptimizerConfig::default().is_met(100.0));
    }
}
