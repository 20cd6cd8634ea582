//! Report output port trait.

use crate::domain::backtest::StrategyRun;
use crate::domain::batch::SymbolBatch;
use crate::domain::comparison::Comparison;
use crate::domain::error::SigtestError;
use crate::domain::optimizer::OptimizationReport;
use crate::domain::strategy::indicators::IndicatorColumn;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

/// The outcome of one CLI command, ready to be written out.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report<'a> {
    Backtest {
        symbol: &'a str,
        /// One date per entry of the run's equity curve.
        dates: Vec<NaiveDate>,
        run: &'a StrategyRun,
        indicators: Vec<IndicatorColumn>,
    },
    /// One backtest per symbol; symbols that failed are listed as skipped.
    BatchBacktest {
        strategy: String,
        batch: &'a SymbolBatch<StrategyRun>,
    },
    BatchComparison {
        batch: &'a SymbolBatch<Comparison>,
    },
    Comparison {
        symbol: &'a str,
        comparison: &'a Comparison,
    },
    Optimization {
        symbol: &'a str,
        optimization: &'a OptimizationReport,
    },
}

/// Port for writing reports. `None` means standard output.
pub trait ReportPort {
    fn write(&self, report: &Report<'_>, output_path: Option<&Path>) -> Result<(), SigtestError>;
}
