//! RSI (Relative Strength Index) with exponential smoothing.
//!
//! delta[i] = C[i] - C[i-1]; gains and losses are smoothed with an EMA of the
//! given span (alpha = 2/(span+1)), seeded with the first delta.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If both averages are 0 the RSI is undefined.
//!
//! Warmup: bar 0 is invalid (no prior delta).

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gains = Vec::with_capacity(bars.len());
    let mut losses = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            gains.push(f64::NAN);
            losses.push(f64::NAN);
        } else {
            let change = bar.close - bars[i - 1].close;
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }
    }

    let avg_gains = ema_values(&gains, period);
    let avg_losses = ema_values(&losses, period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let rsi = rsi_from_averages(avg_gains[i], avg_losses[i]);
            IndicatorPoint {
                date: bar.date,
                valid: rsi.is_some(),
                value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return None;
    }
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { Some(100.0) } else { None };
    }
    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert!(series.values.is_empty());
    }

    #[test]
    fn rsi_first_bar_invalid() {
        let series = calculate_rsi(&test_bars(&[100.0, 101.0, 99.0]), 14);
        assert_eq!(series.values.len(), 3);
        assert!(!series.values[0].valid);
        assert!(series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn rsi_all_gains() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&test_bars(&prices), 14);
        assert_eq!(series.values[19].simple(), Some(100.0));
    }

    #[test]
    fn rsi_all_losses() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&test_bars(&prices), 14);
        let rsi = series.values[19].simple().unwrap();
        assert!(rsi.abs() < 1e-12);
    }

    #[test]
    fn rsi_flat_prices_undefined() {
        let series = calculate_rsi(&test_bars(&[50.0; 10]), 5);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_known_values() {
        // span 3 -> alpha 0.5
        // deltas: +2, -1 -> avg_gain: 2, 1 ; avg_loss: 0, 0.5
        let series = calculate_rsi(&test_bars(&[10.0, 12.0, 11.0]), 3);
        assert_eq!(series.values[1].simple(), Some(100.0));
        let expected = 100.0 - 100.0 / (1.0 + 1.0 / 0.5);
        assert!((series.values[2].simple().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&test_bars(&prices), 14);
        for rsi in series.simple_values().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&test_bars(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_indicator_type() {
        let series = calculate_rsi(&test_bars(&[100.0]), 14);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(14));
    }
}
