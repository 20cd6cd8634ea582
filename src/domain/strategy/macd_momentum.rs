//! MACD momentum crossover.
//!
//! Buy when the MACD line crosses from at-or-below to above its signal line,
//! sell on the reverse crossing. Nothing is emitted until `slow + signal`
//! bars of history exist, and a position flag drops a leading Sell.

use crate::domain::indicator::IndicatorValue;
use crate::domain::indicator::macd::calculate_macd;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{EntryExitLatch, Signal};

pub fn generate(
    bars: &[OhlcvBar],
    fast_span: usize,
    slow_span: usize,
    signal_span: usize,
) -> Vec<Signal> {
    if bars.len() < slow_span + signal_span {
        return vec![Signal::Hold; bars.len()];
    }

    let series = calculate_macd(bars, fast_span, slow_span, signal_span);
    let above: Vec<bool> = series
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Macd { line, signal, .. } => line > signal,
            _ => false,
        })
        .collect();

    let mut latch = EntryExitLatch::default();
    series
        .values
        .iter()
        .enumerate()
        .map(|(i, point)| {
            if !point.valid || i == 0 {
                return Signal::Hold;
            }
            match Signal::from_transition(above[i - 1], above[i]) {
                Signal::Buy => latch.step(true, false),
                Signal::Sell => latch.step(false, true),
                Signal::Hold => Signal::Hold,
            }
        })
        .collect()
}
