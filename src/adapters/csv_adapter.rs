//! CSV file data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with a header row. Columns are
//! located by name (case-insensitive), so extra columns such as `Name` or
//! `Marketcap` are ignored. Dates may carry a time component, which is
//! dropped.

use crate::domain::error::SigtestError;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Positions of the required columns, in `COLUMNS` order.
fn column_indices(headers: &StringRecord) -> Result<[usize; 6], SigtestError> {
    let mut indices = [0usize; 6];
    for (slot, name) in indices.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| SigtestError::data_quality(format!("missing {} column", name)))?;
    }
    Ok(indices)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_field(record: &StringRecord, index: usize, name: &str, line: u64) -> Result<f64, SigtestError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|e| {
        SigtestError::data_quality(format!("line {}: invalid {} value {:?}: {}", line, name, raw, e))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, SigtestError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SigtestError::NoData {
                    symbol: symbol.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| SigtestError::data_quality(format!("CSV header error: {}", e)))?
            .clone();
        let [date_idx, open_idx, high_idx, low_idx, close_idx, volume_idx] =
            column_indices(&headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| SigtestError::data_quality(format!("CSV parse error: {}", e)))?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = record.get(date_idx).unwrap_or("");
            let date = parse_date(date_str).ok_or_else(|| {
                SigtestError::data_quality(format!("line {}: invalid date {:?}", line, date_str))
            })?;

            if start_date.is_some_and(|start| date < start) || end_date.is_some_and(|end| date > end) {
                continue;
            }

            bars.push(OhlcvBar {
                date,
                open: parse_field(&record, open_idx, "open", line)?,
                high: parse_field(&record, high_idx, "high", line)?,
                low: parse_field(&record, low_idx, "low", line)?,
                close: parse_field(&record, close_idx, "close", line)?,
                volume: parse_field(&record, volume_idx, "volume", line)?,
            });
        }

        if bars.is_empty() {
            return Err(SigtestError::NoData {
                symbol: symbol.to_string(),
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!(symbol, bars = bars.len(), path = %path.display(), "Loaded price data");
        PriceSeries::new(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtestError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
