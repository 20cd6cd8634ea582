//! Trend-crossover on two simple moving averages.
//!
//! Per bar, "short above long" is a boolean (false while either mean is
//! undefined); the signal is the change of that boolean between bars.

use std::iter;

use crate::domain::indicator::calculate_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Signal;

pub fn generate(bars: &[OhlcvBar], short_window: usize, long_window: usize) -> Vec<Signal> {
    let short = calculate_sma(bars, short_window).simple_values();
    let long = calculate_sma(bars, long_window).simple_values();

    let above: Vec<bool> = short
        .iter()
        .zip(&long)
        .map(|(s, l)| match (s, l) {
            (Some(s), Some(l)) => s > l,
            _ => false,
        })
        .collect();

    iter::once(Signal::Hold)
        .chain(
            above
                .windows(2)
                .map(|w| Signal::from_transition(w[0], w[1])),
        )
        .take(bars.len())
        .collect()
}
