//! Rolling sample standard deviation, the spread term of Bollinger Bands.
//!
//! Sample standard deviation (divides by n-1) over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / (n-1))
//! A window exists only from bar n-1 on; n < 2 never yields a value.

use crate::domain::ohlcv::OhlcvBar;

/// The `period` closes ending at bar `i`, if that many exist.
pub(crate) fn window_closes(bars: &[OhlcvBar], i: usize, period: usize) -> Option<Vec<f64>> {
    if period == 0 || i + 1 < period {
        return None;
    }
    Some(bars[i + 1 - period..=i].iter().map(|b| b.close).collect())
}

/// Sample standard deviation; `None` for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}
