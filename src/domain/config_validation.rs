//! Configuration loading and validation.
//!
//! Reads the INI sections through [`ConfigPort`] into explicit domain config
//! values, rejecting malformed or out-of-range entries before any run starts.
//! Missing optional keys fall back to the documented defaults.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::backtest::{
    BacktestConfig, DEFAULT_COMMISSION, DEFAULT_INITIAL_CAPITAL, DEFAULT_PERIODS_PER_YEAR,
    DEFAULT_RISK_FREE_RATE,
};
use crate::domain::error::SigtestError;
use crate::domain::optimizer::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TARGET_METRIC, DEFAULT_TOP_K, OptimizerConfig, ParameterGrid,
};
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;

/// Where the price data lives.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: String,
    /// Empty when only `symbols` is configured.
    pub symbol: String,
    /// `[data] symbols`, run one after another by the batch commands.
    pub symbols: Vec<String>,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub backtest: BacktestConfig,
    pub data: DataConfig,
    pub strategy: StrategyParams,
    pub optimizer: OptimizerConfig,
    pub grid: Option<ParameterGrid>,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, SigtestError> {
    let strategy = load_strategy_params(config)?;
    let grid = load_parameter_grid(config, strategy.kind())?;
    Ok(RunConfig {
        backtest: load_backtest_config(config)?,
        data: load_data_config(config)?,
        strategy,
        optimizer: load_optimizer_config(config)?,
        grid,
    })
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SigtestError> {
    let backtest = BacktestConfig {
        initial_capital: parse_or(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
        commission: parse_or(config, "backtest", "commission", DEFAULT_COMMISSION)?,
        risk_free_rate: parse_or(config, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?,
        periods_per_year: parse_or(
            config,
            "backtest",
            "periods_per_year",
            DEFAULT_PERIODS_PER_YEAR,
        )?,
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
    };
    backtest
        .validate()
        .map_err(|e| as_config_invalid("backtest", e))?;
    Ok(backtest)
}

/// `symbol` is required unless a non-empty `symbols` list is given.
pub fn load_data_config(config: &dyn ConfigPort) -> Result<DataConfig, SigtestError> {
    let dir = require_non_empty(config, "data", "dir")?;
    let symbols = config.get_list("data", "symbols").unwrap_or_default();
    let symbol = if symbols.is_empty() {
        require_non_empty(config, "data", "symbol")?
    } else {
        config
            .get_string("data", "symbol")
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    Ok(DataConfig {
        dir,
        symbol,
        symbols,
    })
}

pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, SigtestError> {
    let kind = match config.get_string("strategy", "type") {
        Some(raw) => raw
            .parse::<StrategyKind>()
            .map_err(|e| as_config_invalid("strategy", e))?,
        None => {
            return Err(SigtestError::ConfigMissing {
                section: "strategy".to_string(),
                key: "type".to_string(),
            });
        }
    };

    let params = match kind.default_params() {
        StrategyParams::SmaCrossover {
            short_window,
            long_window,
        } => StrategyParams::SmaCrossover {
            short_window: parse_or(config, "strategy", "short_window", short_window)?,
            long_window: parse_or(config, "strategy", "long_window", long_window)?,
        },
        StrategyParams::Rsi {
            period,
            lower_threshold,
            upper_threshold,
        } => StrategyParams::Rsi {
            period: parse_or(config, "strategy", "period", period)?,
            lower_threshold: parse_or(config, "strategy", "lower_threshold", lower_threshold)?,
            upper_threshold: parse_or(config, "strategy", "upper_threshold", upper_threshold)?,
        },
        StrategyParams::Bollinger {
            period,
            std_dev_multiplier,
        } => StrategyParams::Bollinger {
            period: parse_or(config, "strategy", "period", period)?,
            std_dev_multiplier: parse_or(
                config,
                "strategy",
                "std_dev_multiplier",
                std_dev_multiplier,
            )?,
        },
        StrategyParams::Macd {
            fast_span,
            slow_span,
            signal_span,
        } => StrategyParams::Macd {
            fast_span: parse_or(config, "strategy", "fast_span", fast_span)?,
            slow_span: parse_or(config, "strategy", "slow_span", slow_span)?,
            signal_span: parse_or(config, "strategy", "signal_span", signal_span)?,
        },
        StrategyParams::BuyAndHold => StrategyParams::BuyAndHold,
    };

    params
        .validate()
        .map_err(|e| as_config_invalid("strategy", e))?;
    Ok(params)
}

pub fn load_optimizer_config(config: &dyn ConfigPort) -> Result<OptimizerConfig, SigtestError> {
    let optimizer = OptimizerConfig {
        target_metric: config
            .get_string("optimizer", "target_metric")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_TARGET_METRIC.to_string()),
        target_value: parse_value(config, "optimizer", "target_value")?,
        max_iterations: parse_or(config, "optimizer", "max_iterations", DEFAULT_MAX_ITERATIONS)?,
        top_k: parse_or(config, "optimizer", "top_k", DEFAULT_TOP_K)?,
    };
    optimizer
        .validate()
        .map_err(|e| as_config_invalid("optimizer", e))?;
    Ok(optimizer)
}

/// The grid for `kind`: the stock grid with any `[optimizer]` list keys
/// overriding its axes. `None` for buy-and-hold.
pub fn load_parameter_grid(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<Option<ParameterGrid>, SigtestError> {
    let Some(grid) = ParameterGrid::default_for(kind) else {
        return Ok(None);
    };
    let grid = match grid {
        ParameterGrid::SmaCrossover {
            short_windows,
            long_windows,
        } => ParameterGrid::SmaCrossover {
            short_windows: list_or(config, "short_windows", short_windows)?,
            long_windows: list_or(config, "long_windows", long_windows)?,
        },
        ParameterGrid::Rsi {
            periods,
            lower_thresholds,
            upper_thresholds,
        } => ParameterGrid::Rsi {
            periods: list_or(config, "rsi_periods", periods)?,
            lower_thresholds: list_or(config, "lower_thresholds", lower_thresholds)?,
            upper_thresholds: list_or(config, "upper_thresholds", upper_thresholds)?,
        },
        ParameterGrid::Bollinger {
            periods,
            std_dev_multipliers,
        } => ParameterGrid::Bollinger {
            periods: list_or(config, "bollinger_periods", periods)?,
            std_dev_multipliers: list_or(config, "std_dev_multipliers", std_dev_multipliers)?,
        },
        ParameterGrid::Macd {
            fast_spans,
            slow_spans,
            signal_spans,
        } => ParameterGrid::Macd {
            fast_spans: list_or(config, "fast_spans", fast_spans)?,
            slow_spans: list_or(config, "slow_spans", slow_spans)?,
            signal_spans: list_or(config, "signal_spans", signal_spans)?,
        },
    };
    Ok(Some(grid))
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SigtestError {
    SigtestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Re-labels a domain parameter error with the config section it came from.
fn as_config_invalid(section: &str, err: SigtestError) -> SigtestError {
    match err {
        SigtestError::Configuration { parameter, reason } => invalid(section, &parameter, reason),
        other => other,
    }
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SigtestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            invalid(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
    }
}

fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SigtestError> {
    Ok(parse_value(config, section, key)?.unwrap_or(default))
}

fn list_or<T: FromStr>(
    config: &dyn ConfigPort,
    key: &str,
    default: Vec<T>,
) -> Result<Vec<T>, SigtestError> {
    let Some(items) = config.get_list("optimizer", key) else {
        return Ok(default);
    };
    if items.is_empty() {
        return Err(invalid("optimizer", key, "list is empty"));
    }
    items
        .iter()
        .map(|item| {
            item.parse::<T>().map_err(|_| {
                invalid("optimizer", key, format!("cannot parse list item '{item}'"))
            })
        })
        .collect()
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<Option<NaiveDate>, SigtestError> {
    match config.get_string("backtest", field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, SigtestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(SigtestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(result: Result<impl std::fmt::Debug, SigtestError>, section: &str, key: &str) {
        match result {
            Err(SigtestError::ConfigInvalid {
                section: s, key: k, ..
            }) => {
                assert_eq!(s, section);
                assert_eq!(k, key);
            }
            other => panic!("expected ConfigInvalid [{section}] {key}, got {other:?}"),
        }
    }

    const FULL: &str = r#"
[backtest]
initial_capital = 50000
commission = 0.002
risk_free_rate = 0.03
periods_per_year = 365
start_date = 2021-01-01
end_date = 2022-12-31

[data]
dir = /data/prices
symbol = BTC

[strategy]
type = rsi
period = 10
lower_threshold = 25
upper_threshold = 75

[optimizer]
target_metric = total_return
target_value = 20
max_iterations = 30
top_k = 5
rsi_periods = 7, 14
"#;

    #[test]
    fn full_config_loads() {
        let run = load_run_config(&make_config(FULL)).unwrap();
        assert!((run.backtest.initial_capital - 50_000.0).abs() < f64::EPSILON);
        assert!((run.backtest.commission - 0.002).abs() < f64::EPSILON);
        assert_eq!(run.backtest.periods_per_year, 365);
        assert_eq!(
            run.backtest.start_date,
            NaiveDate::from_ymd_opt(2021, 1, 1)
        );
        assert_eq!(run.data.symbol, "BTC");
        assert_eq!(
            run.strategy,
            StrategyParams::Rsi {
                period: 10,
                lower_threshold: 25.0,
                upper_threshold: 75.0
            }
        );
        assert_eq!(run.optimizer.target_metric, "total_return");
        assert_eq!(run.optimizer.target_value, Some(20.0));
        assert_eq!(run.optimizer.top_k, 5);
        match run.grid {
            Some(ParameterGrid::Rsi {
                periods,
                lower_thresholds,
                ..
            }) => {
                assert_eq!(periods, vec![7, 14]);
                assert_eq!(lower_thresholds, vec![20.0, 25.0, 30.0, 35.0]);
            }
            other => panic!("unexpected grid {other:?}"),
        }
    }

    #[test]
    fn backtest_defaults_apply() {
        let backtest = load_backtest_config(&make_config("[backtest]\n")).unwrap();
        assert_eq!(backtest, BacktestConfig::default());
    }

    #[test]
    fn strategy_defaults_apply() {
        let params = load_strategy_params(&make_config("[strategy]\ntype = macd\n")).unwrap();
        assert_eq!(params, StrategyKind::Macd.default_params());
    }

    #[test]
    fn missing_strategy_type() {
        let err = load_strategy_params(&make_config("[strategy]\nperiod = 5\n")).unwrap_err();
        assert!(matches!(err, SigtestError::ConfigMissing { .. }));
    }

    #[test]
    fn unknown_strategy_type() {
        assert_invalid(
            load_strategy_params(&make_config("[strategy]\ntype = momentum\n")),
            "strategy",
            "type",
        );
    }

    #[test]
    fn strategy_rule_violation_names_key() {
        let content = "[strategy]\ntype = sma_crossover\nshort_window = 60\nlong_window = 50\n";
        assert_invalid(
            load_strategy_params(&make_config(content)),
            "strategy",
            "short_window",
        );
    }

    #[test]
    fn non_numeric_value_fails() {
        assert_invalid(
            load_backtest_config(&make_config("[backtest]\ncommission = lots\n")),
            "backtest",
            "commission",
        );
    }

    #[test]
    fn negative_window_fails_to_parse() {
        let content = "[strategy]\ntype = sma_crossover\nshort_window = -5\n";
        assert_invalid(
            load_strategy_params(&make_config(content)),
            "strategy",
            "short_window",
        );
    }

    #[test]
    fn commission_out_of_range_fails() {
        assert_invalid(
            load_backtest_config(&make_config("[backtest]\ncommission = 1.5\n")),
            "backtest",
            "commission",
        );
    }

    #[test]
    fn capital_must_be_positive() {
        assert_invalid(
            load_backtest_config(&make_config("[backtest]\ninitial_capital = 0\n")),
            "backtest",
            "initial_capital",
        );
    }

    #[test]
    fn invalid_date_format_fails() {
        assert_invalid(
            load_backtest_config(&make_config("[backtest]\nstart_date = 01/02/2021\n")),
            "backtest",
            "start_date",
        );
    }

    #[test]
    fn start_after_end_fails() {
        let content = "[backtest]\nstart_date = 2022-01-01\nend_date = 2021-01-01\n";
        assert_invalid(
            load_backtest_config(&make_config(content)),
            "backtest",
            "start_date",
        );
    }

    #[test]
    fn missing_data_symbol() {
        let err = load_data_config(&make_config("[data]\ndir = /tmp\n")).unwrap_err();
        match err {
            SigtestError::ConfigMissing { section, key } => {
                assert_eq!(section, "data");
                assert_eq!(key, "symbol");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn symbols_list_stands_in_for_symbol() {
        let data = load_data_config(&make_config("[data]\ndir = /tmp\nsymbols = BTC, ETH\n")).unwrap();
        assert_eq!(data.symbol, "");
        assert_eq!(data.symbols, vec!["BTC".to_string(), "ETH".to_string()]);
    }

    #[test]
    fn empty_symbols_list_still_needs_symbol() {
        let err = load_data_config(&make_config("[data]\ndir = /tmp\nsymbols = ,\n")).unwrap_err();
        assert!(matches!(err, SigtestError::ConfigMissing { ref key, .. } if key == "symbol"));
    }

    #[test]
    fn unknown_target_metric_fails() {
        assert_invalid(
            load_optimizer_config(&make_config("[optimizer]\ntarget_metric = alpha\n")),
            "optimizer",
            "target_metric",
        );
    }

    #[test]
    fn grid_list_overrides() {
        let content = "[optimizer]\nshort_windows = 3, 4\nlong_windows = 10\n";
        let grid = load_parameter_grid(&make_config(content), StrategyKind::SmaCrossover)
            .unwrap()
            .unwrap();
        assert_eq!(grid.combinations().len(), 2);
    }

    #[test]
    fn bad_grid_item_fails() {
        assert_invalid(
            load_parameter_grid(
                &make_config("[optimizer]\nfast_spans = 8, x\n"),
                StrategyKind::Macd,
            ),
            "optimizer",
            "fast_spans",
        );
    }

    #[test]
    fn buy_and_hold_has_no_grid() {
        let grid = load_parameter_grid(&make_config(""), StrategyKind::BuyAndHold).unwrap();
        assert!(grid.is_none());
    }
}
