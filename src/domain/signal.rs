//! Trade signals and the position state derived from them.

use serde::Serialize;

/// A per-bar trade instruction. Not a position: it is evaluated relative to
/// the position held at that bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Buy = +1, Sell = -1, Hold = 0
    pub fn value(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }

    /// Maps the difference of two consecutive boolean states onto a signal.
    pub fn from_transition(prev: bool, curr: bool) -> Self {
        match (prev, curr) {
            (false, true) => Signal::Buy,
            (true, false) => Signal::Sell,
            _ => Signal::Hold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Position {
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn is_long(self) -> bool {
        self == Position::Long
    }
}

/// Cumulative position series: Buy forces Long, Sell forces Flat, Hold keeps
/// the previous state. The state before bar 0 is Flat.
pub fn derive_positions(signals: &[Signal]) -> Vec<Position> {
    signals
        .iter()
        .scan(Position::Flat, |state, signal| {
            *state = match signal {
                Signal::Buy => Position::Long,
                Signal::Sell => Position::Flat,
                Signal::Hold => *state,
            };
            Some(*state)
        })
        .collect()
}

/// Tracks an in-generator position flag so that entries and exits are emitted
/// once per state transition rather than on every bar a condition holds.
#[derive(Debug, Default)]
pub(crate) struct EntryExitLatch {
    in_position: bool,
}

impl EntryExitLatch {
    pub(crate) fn step(&mut self, enter: bool, exit: bool) -> Signal {
        if !self.in_position && enter {
            self.in_position = true;
            Signal::Buy
        } else if self.in_position && exit {
            self.in_position = false;
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
