//! Bollinger band mean reversion.
//!
//! Enter when the close touches or breaks the lower band while flat; exit when
//! it touches or breaks the upper band while in. One emission per transition.

use crate::domain::indicator::IndicatorValue;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{EntryExitLatch, Signal};

pub fn generate(bars: &[OhlcvBar], period: usize, std_dev_multiplier: f64) -> Vec<Signal> {
    let mut latch = EntryExitLatch::default();
    calculate_bollinger(bars, period, std_dev_multiplier)
        .values
        .iter()
        .zip(bars)
        .map(|(point, bar)| match point.value {
            IndicatorValue::Bollinger { upper, lower, .. } if point.valid => {
                latch.step(bar.close <= lower, bar.close >= upper)
            }
            _ => Signal::Hold,
        })
        .collect()
}
