//! Runs one job per symbol in parallel.
//!
//! Each symbol's series is fetched through the [`DataPort`] and handed to the
//! job. A symbol whose fetch or job fails is logged and skipped; the batch
//! fails only when every symbol does.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::domain::error::SigtestError;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOutcome<T> {
    pub symbol: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub bars: usize,
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolBatch<T> {
    /// In the order the symbols were requested.
    pub results: Vec<SymbolOutcome<T>>,
    pub skipped: Vec<SkippedSymbol>,
}

pub fn run_per_symbol<D, T, F>(
    data: &D,
    symbols: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    job: F,
) -> Result<SymbolBatch<T>, SigtestError>
where
    D: DataPort + Sync + ?Sized,
    T: Send,
    F: Fn(&str, &PriceSeries) -> Result<T, SigtestError> + Sync,
{
    if symbols.is_empty() {
        return Err(SigtestError::configuration(
            "symbols",
            "at least one symbol is required",
        ));
    }

    let outcomes: Vec<(&String, Result<SymbolOutcome<T>, SigtestError>)> = symbols
        .par_iter()
        .map(|symbol| {
            let outcome = data
                .fetch_ohlcv(symbol, start_date, end_date)
                .and_then(|prices| {
                    let result = job(symbol.as_str(), &prices)?;
                    Ok(SymbolOutcome {
                        symbol: symbol.clone(),
                        first_date: prices.first_date(),
                        last_date: prices.last_date(),
                        bars: prices.len(),
                        result,
                    })
                });
            (symbol, outcome)
        })
        .collect();

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    let mut first_error = None;
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) if results.is_empty() => Err(e),
        _ => Ok(SymbolBatch { results, skipped }),
    }
}
