//! Indicator columns behind a strategy's signals, aligned bar-for-bar with
//! the price series so a backtest report can show what the strategy saw.
//!
//! Bollinger columns carry bandwidth and %B next to the bands; MACD columns
//! carry the histogram next to the line and signal.

use serde::Serialize;

use crate::domain::error::SigtestError;
use crate::domain::indicator::bollinger::{bandwidth, calculate_bollinger, percent_b};
use crate::domain::indicator::macd::calculate_macd;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue, calculate_sma};
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorColumn {
    /// `SMA(20)`, `RSI(14)`, `BOLLINGER(20,2).percent_b`, ...
    pub name: String,
    /// `None` inside the warmup or where the value is undefined.
    pub values: Vec<Option<f64>>,
}

impl IndicatorColumn {
    fn new(label: &str, field: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: format!("{label}.{field}"),
            values,
        }
    }

    fn simple(series: &IndicatorSeries) -> Self {
        Self {
            name: series.indicator_type.to_string(),
            values: series.simple_values(),
        }
    }
}

/// The indicators `params` trades on, one column per output. Buy-and-hold
/// has none.
pub fn strategy_indicators(
    prices: &PriceSeries,
    params: &StrategyParams,
) -> Result<Vec<IndicatorColumn>, SigtestError> {
    params.validate()?;
    let bars = prices.bars();
    let columns = match *params {
        StrategyParams::SmaCrossover {
            short_window,
            long_window,
        } => vec![
            IndicatorColumn::simple(&calculate_sma(bars, short_window)),
            IndicatorColumn::simple(&calculate_sma(bars, long_window)),
        ],
        StrategyParams::Rsi { period, .. } => {
            vec![IndicatorColumn::simple(&calculate_rsi(bars, period))]
        }
        StrategyParams::Bollinger {
            period,
            std_dev_multiplier,
        } => bollinger_columns(bars, period, std_dev_multiplier),
        StrategyParams::Macd {
            fast_span,
            slow_span,
            signal_span,
        } => macd_columns(bars, fast_span, slow_span, signal_span),
        StrategyParams::BuyAndHold => Vec::new(),
    };
    Ok(columns)
}

fn bollinger_columns(bars: &[OhlcvBar], period: usize, multiplier: f64) -> Vec<IndicatorColumn> {
    let series = calculate_bollinger(bars, period, multiplier);
    let label = series.indicator_type.to_string();
    let bands: Vec<Option<(f64, f64, f64)>> = series
        .values
        .iter()
        .map(|point| match point.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } if point.valid => Some((upper, middle, lower)),
            _ => None,
        })
        .collect();

    let pick = |f: fn((f64, f64, f64)) -> f64| -> Vec<Option<f64>> {
        bands.iter().map(|b| b.map(f)).collect()
    };
    vec![
        IndicatorColumn::new(&label, "upper", pick(|(u, _, _)| u)),
        IndicatorColumn::new(&label, "middle", pick(|(_, m, _)| m)),
        IndicatorColumn::new(&label, "lower", pick(|(_, _, l)| l)),
        IndicatorColumn::new(
            &label,
            "bandwidth",
            bands
                .iter()
                .map(|b| b.and_then(|(u, m, l)| bandwidth(u, m, l)))
                .collect(),
        ),
        IndicatorColumn::new(
            &label,
            "percent_b",
            bands
                .iter()
                .zip(bars)
                .map(|(b, bar)| b.and_then(|(u, _, l)| percent_b(bar.close, u, l)))
                .collect(),
        ),
    ]
}

fn macd_columns(bars: &[OhlcvBar], fast: usize, slow: usize, signal: usize) -> Vec<IndicatorColumn> {
    let series = calculate_macd(bars, fast, slow, signal);
    let label = series.indicator_type.to_string();
    let points: Vec<Option<(f64, f64, f64)>> = series
        .values
        .iter()
        .map(|point| match point.value {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } if point.valid => Some((line, signal, histogram)),
            _ => None,
        })
        .collect();

    let pick = |f: fn((f64, f64, f64)) -> f64| -> Vec<Option<f64>> {
        points.iter().map(|p| p.map(f)).collect()
    };
    vec![
        IndicatorColumn::new(&label, "line", pick(|(l, _, _)| l)),
        IndicatorColumn::new(&label, "signal", pick(|(_, s, _)| s)),
        IndicatorColumn::new(&label, "histogram", pick(|(_, _, h)| h)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::StrategyKind;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes).unwrap()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 10.0 * (i as f64 / 4.0).sin()).collect()
    }

    fn column<'a>(columns: &'a [IndicatorColumn], name: &str) -> &'a IndicatorColumn {
        columns
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no column {name}"))
    }

    #[test]
    fn sma_crossover_has_both_means() {
        let prices = series(&wave(30));
        let params = StrategyParams::SmaCrossover {
            short_window: 3,
            long_window: 8,
        };
        let columns = strategy_indicators(&prices, &params).unwrap();

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["SMA(3)", "SMA(8)"]);
        assert!(columns.iter().all(|c| c.values.len() == 30));
        assert_eq!(columns[1].values[6], None);
        assert!(columns[1].values[7].is_some());
    }

    #[test]
    fn bollinger_bandwidth_and_percent_b() {
        let closes = wave(30);
        let prices = series(&closes);
        let params = StrategyParams::Bollinger {
            period: 5,
            std_dev_multiplier: 2.0,
        };
        let columns = strategy_indicators(&prices, &params).unwrap();
        assert_eq!(columns.len(), 5);

        let upper = column(&columns, "BOLLINGER(5,2).upper");
        let middle = column(&columns, "BOLLINGER(5,2).middle");
        let lower = column(&columns, "BOLLINGER(5,2).lower");
        let width = column(&columns, "BOLLINGER(5,2).bandwidth");
        let pct = column(&columns, "BOLLINGER(5,2).percent_b");

        assert_eq!(pct.values[3], None);
        for i in 4..30 {
            let (u, m, l) = (
                upper.values[i].unwrap(),
                middle.values[i].unwrap(),
                lower.values[i].unwrap(),
            );
            assert!((width.values[i].unwrap() - (u - l) / m).abs() < 1e-12);
            assert!((pct.values[i].unwrap() - (closes[i] - l) / (u - l)).abs() < 1e-12);
        }
    }

    #[test]
    fn collapsed_bands_have_no_percent_b() {
        let prices = series(&[100.0; 10]);
        let params = StrategyParams::Bollinger {
            period: 4,
            std_dev_multiplier: 2.0,
        };
        let columns = strategy_indicators(&prices, &params).unwrap();

        assert_eq!(column(&columns, "BOLLINGER(4,2).bandwidth").values[9], Some(0.0));
        assert_eq!(column(&columns, "BOLLINGER(4,2).percent_b").values[9], None);
    }

    #[test]
    fn macd_histogram_column() {
        let prices = series(&wave(60));
        let params = StrategyParams::Macd {
            fast_span: 5,
            slow_span: 10,
            signal_span: 4,
        };
        let columns = strategy_indicators(&prices, &params).unwrap();

        let line = column(&columns, "MACD(5,10,4).line");
        let signal = column(&columns, "MACD(5,10,4).signal");
        let histogram = column(&columns, "MACD(5,10,4).histogram");
        assert_eq!(histogram.values[0], None);
        for i in 13..60 {
            let expected = line.values[i].unwrap() - signal.values[i].unwrap();
            assert!((histogram.values[i].unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn rsi_has_one_column() {
        let prices = series(&wave(20));
        let params = StrategyKind::Rsi.default_params();
        let columns = strategy_indicators(&prices, &params).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "RSI(14)");
        assert_eq!(columns[0].values[0], None);
    }

    #[test]
    fn buy_and_hold_has_no_indicators() {
        let prices = series(&wave(5));
        assert!(
            strategy_indicators(&prices, &StrategyParams::BuyAndHold)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn invalid_params_are_rejected() {
        let prices = series(&wave(5));
        let params = StrategyParams::SmaCrossover {
            short_window: 10,
            long_window: 5,
        };
        assert!(matches!(
            strategy_indicators(&prices, &params),
            Err(SigtestError::Configuration { .. })
        ));
    }
}
