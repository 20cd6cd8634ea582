//! RSI mean reversion.
//!
//! Buy when RSI drops below the lower threshold while flat; sell when it rises
//! above the upper threshold while in. Bars without a defined RSI are Hold.

use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{EntryExitLatch, Signal};

pub fn generate(
    bars: &[OhlcvBar],
    period: usize,
    lower_threshold: f64,
    upper_threshold: f64,
) -> Vec<Signal> {
    let mut latch = EntryExitLatch::default();
    calculate_rsi(bars, period)
        .simple_values()
        .into_iter()
        .map(|rsi| match rsi {
            Some(rsi) => latch.step(rsi < lower_threshold, rsi > upper_threshold),
            None => Signal::Hold,
        })
        .collect()
}
