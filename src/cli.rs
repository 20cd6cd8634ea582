//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::run_strategy;
use crate::domain::batch::{SkippedSymbol, run_per_symbol};
use crate::domain::comparison::{Comparison, compare_strategies};
use crate::domain::config_validation::{RunConfig, load_run_config};
use crate::domain::error::SigtestError;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::optimizer::optimize;
use crate::domain::strategy::indicators::strategy_indicators;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{Report, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "sigtest", about = "Signal strategy backtester and risk metrics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[data] symbol`
        #[arg(long)]
        symbol: Option<String>,
        /// Comma-separated; overrides `[data] symbols`
        #[arg(long, value_delimiter = ',', conflicts_with = "symbol")]
        symbols: Vec<String>,
        /// JSON report path; standard output when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        compact: bool,
    },
    /// Run every strategy family on the same data and rank them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_delimiter = ',', conflicts_with = "symbol")]
        symbols: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        compact: bool,
    },
    /// Grid-search the configured strategy's parameters
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Overrides `[optimizer] target_metric`
        #[arg(long)]
        metric: Option<String>,
        /// Overrides `[optimizer] target_value`
        #[arg(long)]
        target: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        compact: bool,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for one symbol or every symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            symbols,
            output,
            compact,
        } => run_backtest(
            &config,
            symbol.as_deref(),
            &symbols,
            output.as_deref(),
            compact,
        ),
        Command::Compare {
            config,
            symbol,
            symbols,
            output,
            compact,
        } => run_compare(
            &config,
            symbol.as_deref(),
            &symbols,
            output.as_deref(),
            compact,
        ),
        Command::Optimize {
            config,
            symbol,
            metric,
            target,
            output,
            compact,
        } => run_optimize(
            &config,
            symbol.as_deref(),
            metric,
            target,
            output.as_deref(),
            compact,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SigtestError> {
    FileConfigAdapter::from_file(path).map_err(|e| SigtestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_run(config_path: &Path) -> Result<RunConfig, SigtestError> {
    info!(path = %config_path.display(), "Loading config");
    let adapter = load_config(config_path)?;
    load_run_config(&adapter)
}

/// Fetches the series for the configured (or overridden) symbol within the
/// configured date range.
fn load_prices(run: &RunConfig, symbol: &str) -> Result<PriceSeries, SigtestError> {
    let data_port = CsvAdapter::new(PathBuf::from(&run.data.dir));
    let prices = data_port.fetch_ohlcv(symbol, run.backtest.start_date, run.backtest.end_date)?;
    info!(
        symbol,
        bars = prices.len(),
        from = %prices.first_date(),
        to = %prices.last_date(),
        "Loaded price data"
    );
    Ok(prices)
}

fn warn_if_short(prices: &PriceSeries, params: &StrategyParams) {
    let warmup = params.warmup();
    if prices.len() < warmup {
        warn!(
            strategy = %params,
            bars = prices.len(),
            warmup,
            "Series is shorter than the strategy warm-up; expect no signals"
        );
    }
}

fn write_report(report: &Report<'_>, output: Option<&Path>, compact: bool) -> Result<(), SigtestError> {
    JsonReportAdapter::new(!compact).write(report, output)
}

fn print_metrics(metrics: &Metrics) {
    eprintln!("Total Return:     {:.2}%", metrics.total_return);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!(
        "Max Drawdown:     {:.1}% ({} bars)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Calmar Ratio:     {:.2}", metrics.calmar_ratio);
    eprintln!("Volatility:       {:.2}", metrics.volatility);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
}

/// The symbol list for a batch run: `--symbols`, else `[data] symbols`.
/// `None` means a single-symbol run, which `--symbol` always forces.
fn batch_symbols(run: &RunConfig, symbol: Option<&str>, symbols: &[String]) -> Option<Vec<String>> {
    if symbol.is_some() {
        None
    } else if !symbols.is_empty() {
        Some(symbols.to_vec())
    } else if !run.data.symbols.is_empty() {
        Some(run.data.symbols.clone())
    } else {
        None
    }
}

fn print_skipped(skipped: &[SkippedSymbol]) {
    for entry in skipped {
        eprintln!("  skipped {}: {}", entry.symbol, entry.reason);
    }
}

fn run_backtest(
    config_path: &Path,
    symbol: Option<&str>,
    symbols: &[String],
    output: Option<&Path>,
    compact: bool,
) -> Result<(), SigtestError> {
    let run = load_run(config_path)?;
    if let Some(symbols) = batch_symbols(&run, symbol, symbols) {
        return run_backtest_batch(&run, &symbols, output, compact);
    }

    let symbol = symbol.unwrap_or(&run.data.symbol);
    let prices = load_prices(&run, symbol)?;
    warn_if_short(&prices, &run.strategy);

    info!(strategy = %run.strategy, "Running backtest");
    let strategy_run = run_strategy(&prices, &run.strategy, &run.backtest)?;

    eprintln!("\n=== {} on {} ===", strategy_run.strategy, symbol);
    eprintln!(
        "Period:           {} to {} ({} bars)",
        prices.first_date(),
        prices.last_date(),
        prices.len()
    );
    eprintln!("Final Equity:     {:.2}", strategy_run.result.final_equity);
    eprintln!("Total Trades:     {}", strategy_run.result.trade_count);
    print_metrics(&strategy_run.metrics);

    let report = Report::Backtest {
        symbol,
        dates: prices.bars().iter().map(|b| b.date).collect(),
        run: &strategy_run,
        indicators: strategy_indicators(&prices, &run.strategy)?,
    };
    write_report(&report, output, compact)
}

fn run_backtest_batch(
    run: &RunConfig,
    symbols: &[String],
    output: Option<&Path>,
    compact: bool,
) -> Result<(), SigtestError> {
    let data_port = CsvAdapter::new(PathBuf::from(&run.data.dir));
    info!(strategy = %run.strategy, symbols = symbols.len(), "Running batch backtest");
    let batch = run_per_symbol(
        &data_port,
        symbols,
        run.backtest.start_date,
        run.backtest.end_date,
        |_, prices| {
            warn_if_short(prices, &run.strategy);
            run_strategy(prices, &run.strategy, &run.backtest)
        },
    )?;

    eprintln!("\n=== {} on {} symbols ===", run.strategy, batch.results.len());
    eprintln!(
        "  {:<12} {:>6} {:>12} {:>10} {:>8} {:>10} {:>7}",
        "Symbol", "Bars", "Equity", "Return %", "Sharpe", "Max DD %", "Trades"
    );
    for outcome in &batch.results {
        let strategy_run = &outcome.result;
        eprintln!(
            "  {:<12} {:>6} {:>12.2} {:>10.2} {:>8.2} {:>10.1} {:>7}",
            outcome.symbol,
            outcome.bars,
            strategy_run.result.final_equity,
            strategy_run.metrics.total_return,
            strategy_run.metrics.sharpe_ratio,
            strategy_run.metrics.max_drawdown * 100.0,
            strategy_run.result.trade_count,
        );
    }
    print_skipped(&batch.skipped);

    let report = Report::BatchBacktest {
        strategy: run.strategy.to_string(),
        batch: &batch,
    };
    write_report(&report, output, compact)
}

/// Defaults for every family, with the configured strategy standing in for
/// its own family.
fn comparison_set(configured: &StrategyParams) -> Vec<StrategyParams> {
    StrategyKind::ALL
        .iter()
        .map(|&kind| {
            if kind == configured.kind() {
                configured.clone()
            } else {
                kind.default_params()
            }
        })
        .collect()
}

fn print_comparison(symbol: &str, comparison: &Comparison) {
    eprintln!("\n=== Strategy Comparison on {} ===", symbol);
    eprintln!(
        "  {:<24} {:>10} {:>8} {:>10} {:>8} {:>7}",
        "Strategy", "Return %", "Sharpe", "Max DD %", "Calmar", "Trades"
    );
    for entry in &comparison.entries {
        eprintln!(
            "  {:<24} {:>10.2} {:>8.2} {:>10.1} {:>8.2} {:>7}",
            entry.strategy,
            entry.total_return,
            entry.sharpe_ratio,
            entry.max_drawdown * 100.0,
            entry.calmar_ratio,
            entry.trade_count,
        );
    }
    eprintln!("\nBest by Sharpe:   {}", comparison.best);
    eprintln!("By total return:  {}", comparison.by_total_return.join(" > "));
    eprintln!("By Calmar:        {}", comparison.by_calmar.join(" > "));
}

fn run_compare(
    config_path: &Path,
    symbol: Option<&str>,
    symbols: &[String],
    output: Option<&Path>,
    compact: bool,
) -> Result<(), SigtestError> {
    let run = load_run(config_path)?;
    let strategies = comparison_set(&run.strategy);

    if let Some(symbols) = batch_symbols(&run, symbol, symbols) {
        let data_port = CsvAdapter::new(PathBuf::from(&run.data.dir));
        info!(
            strategies = strategies.len(),
            symbols = symbols.len(),
            "Comparing strategies across symbols"
        );
        let batch = run_per_symbol(
            &data_port,
            &symbols,
            run.backtest.start_date,
            run.backtest.end_date,
            |_, prices| compare_strategies(prices, &strategies, &run.backtest),
        )?;
        for outcome in &batch.results {
            print_comparison(&outcome.symbol, &outcome.result);
        }
        print_skipped(&batch.skipped);
        return write_report(&Report::BatchComparison { batch: &batch }, output, compact);
    }

    let symbol = symbol.unwrap_or(&run.data.symbol);
    let prices = load_prices(&run, symbol)?;
    for params in &strategies {
        warn_if_short(&prices, params);
    }

    info!(strategies = strategies.len(), "Comparing strategies");
    let comparison = compare_strategies(&prices, &strategies, &run.backtest)?;
    print_comparison(symbol, &comparison);

    let report = Report::Comparison {
        symbol,
        comparison: &comparison,
    };
    write_report(&report, output, compact)
}

fn run_optimize(
    config_path: &Path,
    symbol: Option<&str>,
    metric: Option<String>,
    target: Option<f64>,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), SigtestError> {
    let mut run = load_run(config_path)?;
    if let Some(metric) = metric {
        run.optimizer.target_metric = metric;
    }
    if target.is_some() {
        run.optimizer.target_value = target;
    }

    let Some(grid) = run.grid.as_ref() else {
        return Err(SigtestError::configuration(
            "type",
            format!("{} has no parameters to optimize", run.strategy.kind()),
        ));
    };

    let symbol = symbol.unwrap_or(&run.data.symbol);
    let prices = load_prices(&run, symbol)?;

    info!(
        strategy = %grid.kind(),
        combinations = grid.combinations().len(),
        max_iterations = run.optimizer.max_iterations,
        metric = %run.optimizer.target_metric,
        "Optimizing parameters"
    );
    let report = optimize(&prices, grid, &run.backtest, &run.optimizer)?;

    eprintln!(
        "\n=== Optimization: {} on {} by {} ===",
        report.strategy, symbol, report.target_metric
    );
    eprintln!(
        "Tested:           {} ({} skipped)",
        report.total_tested, report.skipped
    );
    for (rank, result) in report.results.iter().enumerate() {
        eprintln!(
            "  {:>2}. {:<24} score {:>10.4}  trades {:>4}  equity {:.2}",
            rank + 1,
            result.strategy,
            result.score,
            result.trade_count,
            result.final_equity,
        );
    }
    eprintln!("\nBest:             {}", report.best.strategy);
    print_metrics(&report.best.metrics);
    if let Some(target) = report.target_value {
        let verdict = if report.target_met { "met" } else { "not met" };
        eprintln!("Target {}:     {} ({})", target, verdict, report.target_metric);
    }

    let output_report = Report::Optimization {
        symbol,
        optimization: &report,
    };
    write_report(&output_report, output, compact)
}

fn run_validate(config_path: &Path) -> Result<(), SigtestError> {
    let run = load_run(config_path)?;

    eprintln!("Config OK: {}", config_path.display());
    if run.data.symbols.is_empty() {
        eprintln!("  Data:       {}/{}.csv", run.data.dir, run.data.symbol);
    } else {
        eprintln!("  Data:       {} [{}]", run.data.dir, run.data.symbols.join(", "));
    }
    eprintln!("  Strategy:   {}", run.strategy);
    eprintln!(
        "  Account:    capital {:.2}, commission {}",
        run.backtest.initial_capital, run.backtest.commission
    );
    match (run.backtest.start_date, run.backtest.end_date) {
        (None, None) => {}
        (start, end) => eprintln!(
            "  Range:      {} to {}",
            start.map_or_else(|| "start".to_string(), |d| d.to_string()),
            end.map_or_else(|| "end".to_string(), |d| d.to_string()),
        ),
    }
    match &run.grid {
        Some(grid) => eprintln!(
            "  Optimizer:  {} combinations, by {}",
            grid.combinations().len().min(run.optimizer.max_iterations),
            run.optimizer.target_metric
        ),
        None => eprintln!("  Optimizer:  nothing to optimize"),
    }
    Ok(())
}

fn data_port_from(config_path: &Path) -> Result<CsvAdapter, SigtestError> {
    let adapter = load_config(config_path)?;
    let dir = adapter
        .get_string("data", "dir")
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| SigtestError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        })?;
    debug!(dir = %dir, "Using CSV data directory");
    Ok(CsvAdapter::new(PathBuf::from(dir.trim())))
}

fn run_list_symbols(config_path: &Path) -> Result<(), SigtestError> {
    let data_port = data_port_from(config_path)?;
    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found");
    }
    for symbol in &symbols {
        println!("{symbol}");
    }
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), SigtestError> {
    let data_port = data_port_from(config_path)?;
    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => data_port.list_symbols()?,
    };

    for symbol in &symbols {
        match data_port.get_data_range(symbol)? {
            Some((first, last, count)) => {
                println!("{symbol}: {first} to {last} ({count} bars)")
            }
            None => println!("{symbol}: no data"),
        }
    }
    Ok(())
}
