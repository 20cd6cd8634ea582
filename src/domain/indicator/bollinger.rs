//! Bollinger Bands indicator.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by n-1).
//! Warmup: first (period-1) bars are invalid; period < 2 is never valid.

use crate::domain::indicator::stddev::{sample_stddev, window_closes};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_bollinger(bars: &[OhlcvBar], period: usize, multiplier: f64) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let bands = window_closes(bars, i, period).and_then(|window| {
                let middle = window.iter().sum::<f64>() / period as f64;
                sample_stddev(&window).map(|sd| {
                    (middle + multiplier * sd, middle, middle - multiplier * sd)
                })
            });
            let (upper, middle, lower) = bands.unwrap_or((0.0, 0.0, 0.0));
            IndicatorPoint {
                date: bar.date,
                valid: bands.is_some(),
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100: (multiplier * 100.0).round() as u32,
        },
        values,
    }
}

/// (upper - lower) / middle
pub fn bandwidth(upper: f64, middle: f64, lower: f64) -> Option<f64> {
    if middle == 0.0 {
        None
    } else {
        Some((upper - lower) / middle)
    }
}

/// (close - lower) / (upper - lower); undefined for collapsed bands.
pub fn percent_b(close: f64, upper: f64, lower: f64) -> Option<f64> {
    let width = upper - lower;
    if width == 0.0 {
        None
    } else {
        Some((close - lower) / width)
    }
}
