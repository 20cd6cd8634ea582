//! Exponential Moving Average indicator.
//!
//! alpha = 2/(span+1), EMA[0] = C[0], EMA[i] = C[i]*alpha + EMA[i-1]*(1-alpha).
//! The recursion is seeded with the first value, so there is no warmup. Used
//! by RSI smoothing and MACD.

/// EMA over an arbitrary value sequence.
///
/// NaN inputs before the first finite value yield NaN; the recursion starts at
/// the first finite value. `span` must be positive.
pub fn ema_values(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;

    for &v in values {
        let next = match ema {
            None if v.is_nan() => None,
            None => Some(v),
            Some(prev) if v.is_nan() => Some(prev),
            Some(prev) => Some(v * alpha + prev * (1.0 - alpha)),
        };
        ema = next;
        out.push(ema.unwrap_or(f64::NAN));
    }

    out
}
