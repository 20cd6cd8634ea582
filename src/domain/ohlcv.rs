//! OHLCV bars and the validated price series the engine runs over.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::SigtestError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// An ordered, non-empty sequence of bars with strictly increasing dates and
/// positive, finite prices.
///
/// Every series derived from a `PriceSeries` (signals, positions, equity) has
/// exactly one value per bar, indexed identically.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, SigtestError> {
        if bars.is_empty() {
            return Err(SigtestError::input_contract("price series is empty"));
        }

        for (i, bar) in bars.iter().enumerate() {
            let fields = [
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
            ];
            for (name, value) in fields {
                if !value.is_finite() {
                    return Err(SigtestError::data_quality(format!(
                        "{name} is not a finite number at bar {i} ({})",
                        bar.date
                    )));
                }
                if value <= 0.0 {
                    return Err(SigtestError::data_quality(format!(
                        "{name} must be positive at bar {i} ({}), got {value}",
                        bar.date
                    )));
                }
            }
            if !bar.volume.is_finite() || bar.volume < 0.0 {
                return Err(SigtestError::data_quality(format!(
                    "volume must be a non-negative number at bar {i} ({})",
                    bar.date
                )));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(SigtestError::input_contract(format!(
                    "timestamps must be strictly increasing: {} follows {} at bar {i}",
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }

        Ok(PriceSeries { bars })
    }

    /// Builds a daily series from closing prices alone, starting at `start`.
    /// Open/high/low are set to the close.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self, SigtestError> {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect();
        Self::new(bars)
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// A `PriceSeries` is never empty, so this is always false.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }
}
