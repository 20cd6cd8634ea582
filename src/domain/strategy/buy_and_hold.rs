//! Passive baseline: Buy on the first bar, Hold for the rest.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Signal;

pub fn generate(bars: &[OhlcvBar]) -> Vec<Signal> {
    let mut signals = vec![Signal::Hold; bars.len()];
    if let Some(first) = signals.first_mut() {
        *first = Signal::Buy;
    }
    signals
}
