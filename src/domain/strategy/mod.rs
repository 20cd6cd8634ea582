//! Strategy parameters and signal generation.
//!
//! Each strategy family is a tagged variant of [`StrategyParams`] with its own
//! pure generator function. [`generate_signals`] validates the parameters and
//! dispatches on the tag; it always returns one signal per bar, with `Hold`
//! wherever a lookback window is not yet filled.

pub mod bollinger_reversion;
pub mod buy_and_hold;
pub mod indicators;
pub mod macd_momentum;
pub mod rsi_reversion;
pub mod sma_crossover;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SigtestError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::Signal;

pub const DEFAULT_SHORT_WINDOW: usize = 20;
pub const DEFAULT_LONG_WINDOW: usize = 50;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_RSI_LOWER: f64 = 30.0;
pub const DEFAULT_RSI_UPPER: f64 = 70.0;
pub const DEFAULT_BANDS_PERIOD: usize = 20;
pub const DEFAULT_BANDS_MULTIPLIER: f64 = 2.0;

/// RSI thresholds outside these conventional limits are rejected.
const RSI_LOWER_MAX: f64 = 40.0;
const RSI_UPPER_MIN: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    SmaCrossover,
    Rsi,
    Bollinger,
    Macd,
    BuyAndHold,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::SmaCrossover,
        StrategyKind::Rsi,
        StrategyKind::Bollinger,
        StrategyKind::Macd,
        StrategyKind::BuyAndHold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover => "sma_crossover",
            StrategyKind::Rsi => "rsi",
            StrategyKind::Bollinger => "bollinger",
            StrategyKind::Macd => "macd",
            StrategyKind::BuyAndHold => "buy_and_hold",
        }
    }

    /// The parameters the family runs with when none are configured.
    pub fn default_params(self) -> StrategyParams {
        match self {
            StrategyKind::SmaCrossover => StrategyParams::SmaCrossover {
                short_window: DEFAULT_SHORT_WINDOW,
                long_window: DEFAULT_LONG_WINDOW,
            },
            StrategyKind::Rsi => StrategyParams::Rsi {
                period: DEFAULT_RSI_PERIOD,
                lower_threshold: DEFAULT_RSI_LOWER,
                upper_threshold: DEFAULT_RSI_UPPER,
            },
            StrategyKind::Bollinger => StrategyParams::Bollinger {
                period: DEFAULT_BANDS_PERIOD,
                std_dev_multiplier: DEFAULT_BANDS_MULTIPLIER,
            },
            StrategyKind::Macd => StrategyParams::Macd {
                fast_span: crate::domain::indicator::macd::DEFAULT_FAST,
                slow_span: crate::domain::indicator::macd::DEFAULT_SLOW,
                signal_span: crate::domain::indicator::macd::DEFAULT_SIGNAL,
            },
            StrategyKind::BuyAndHold => StrategyParams::BuyAndHold,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = SigtestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                SigtestError::configuration(
                    "type",
                    format!(
                        "unknown strategy '{s}', expected one of: sma_crossover, rsi, bollinger, macd, buy_and_hold"
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    SmaCrossover {
        short_window: usize,
        long_window: usize,
    },
    Rsi {
        period: usize,
        lower_threshold: f64,
        upper_threshold: f64,
    },
    Bollinger {
        period: usize,
        std_dev_multiplier: f64,
    },
    Macd {
        fast_span: usize,
        slow_span: usize,
        signal_span: usize,
    },
    BuyAndHold,
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::SmaCrossover { .. } => StrategyKind::SmaCrossover,
            StrategyParams::Rsi { .. } => StrategyKind::Rsi,
            StrategyParams::Bollinger { .. } => StrategyKind::Bollinger,
            StrategyParams::Macd { .. } => StrategyKind::Macd,
            StrategyParams::BuyAndHold => StrategyKind::BuyAndHold,
        }
    }

    /// Checks the parameter rules for the variant. Violations are reported,
    /// never corrected.
    pub fn validate(&self) -> Result<(), SigtestError> {
        match *self {
            StrategyParams::SmaCrossover {
                short_window,
                long_window,
            } => {
                require_positive("short_window", short_window)?;
                require_positive("long_window", long_window)?;
                if short_window >= long_window {
                    return Err(SigtestError::configuration(
                        "short_window",
                        format!("must be less than long_window ({short_window} >= {long_window})"),
                    ));
                }
            }
            StrategyParams::Rsi {
                period,
                lower_threshold,
                upper_threshold,
            } => {
                require_positive("period", period)?;
                for (name, value) in [
                    ("lower_threshold", lower_threshold),
                    ("upper_threshold", upper_threshold),
                ] {
                    if !(0.0..=100.0).contains(&value) {
                        return Err(SigtestError::configuration(
                            name,
                            format!("must be within [0, 100], got {value}"),
                        ));
                    }
                }
                if lower_threshold >= upper_threshold {
                    return Err(SigtestError::configuration(
                        "lower_threshold",
                        format!(
                            "must be less than upper_threshold ({lower_threshold} >= {upper_threshold})"
                        ),
                    ));
                }
                if lower_threshold > RSI_LOWER_MAX {
                    return Err(SigtestError::configuration(
                        "lower_threshold",
                        format!("must be at most {RSI_LOWER_MAX}, got {lower_threshold}"),
                    ));
                }
                if upper_threshold < RSI_UPPER_MIN {
                    return Err(SigtestError::configuration(
                        "upper_threshold",
                        format!("must be at least {RSI_UPPER_MIN}, got {upper_threshold}"),
                    ));
                }
            }
            StrategyParams::Bollinger {
                period,
                std_dev_multiplier,
            } => {
                if period < 2 {
                    return Err(SigtestError::configuration(
                        "period",
                        format!("must be at least 2 for a standard deviation, got {period}"),
                    ));
                }
                if !(std_dev_multiplier.is_finite() && std_dev_multiplier > 0.0) {
                    return Err(SigtestError::configuration(
                        "std_dev_multiplier",
                        format!("must be positive, got {std_dev_multiplier}"),
                    ));
                }
            }
            StrategyParams::Macd {
                fast_span,
                slow_span,
                signal_span,
            } => {
                require_positive("fast_span", fast_span)?;
                require_positive("slow_span", slow_span)?;
                require_positive("signal_span", signal_span)?;
                if fast_span >= slow_span {
                    return Err(SigtestError::configuration(
                        "fast_span",
                        format!("must be less than slow_span ({fast_span} >= {slow_span})"),
                    ));
                }
            }
            StrategyParams::BuyAndHold => {}
        }
        Ok(())
    }

    /// Bars of history needed before the generator can emit anything but Hold.
    pub fn warmup(&self) -> usize {
        match *self {
            StrategyParams::SmaCrossover { long_window, .. } => long_window,
            StrategyParams::Rsi { .. } => 2,
            StrategyParams::Bollinger { period, .. } => period,
            StrategyParams::Macd {
                slow_span,
                signal_span,
                ..
            } => slow_span + signal_span,
            StrategyParams::BuyAndHold => 1,
        }
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyParams::SmaCrossover {
                short_window,
                long_window,
            } => write!(f, "SMA({},{})", short_window, long_window),
            StrategyParams::Rsi {
                period,
                lower_threshold,
                upper_threshold,
            } => write!(f, "RSI({},{}-{})", period, lower_threshold, upper_threshold),
            StrategyParams::Bollinger {
                period,
                std_dev_multiplier,
            } => write!(f, "BollingerBands({},{})", period, std_dev_multiplier),
            StrategyParams::Macd {
                fast_span,
                slow_span,
                signal_span,
            } => write!(f, "MACD({},{},{})", fast_span, slow_span, signal_span),
            StrategyParams::BuyAndHold => write!(f, "BuyAndHold"),
        }
    }
}

fn require_positive(name: &str, value: usize) -> Result<(), SigtestError> {
    if value == 0 {
        Err(SigtestError::configuration(name, "must be a positive integer"))
    } else {
        Ok(())
    }
}

/// Validates `params` and produces one signal per bar of `prices`.
pub fn generate_signals(
    prices: &PriceSeries,
    params: &StrategyParams,
) -> Result<Vec<Signal>, SigtestError> {
    params.validate()?;
    let bars = prices.bars();
    let signals = match *params {
        StrategyParams::SmaCrossover {
            short_window,
            long_window,
        } => sma_crossover::generate(bars, short_window, long_window),
        StrategyParams::Rsi {
            period,
            lower_threshold,
            upper_threshold,
        } => rsi_reversion::generate(bars, period, lower_threshold, upper_threshold),
        StrategyParams::Bollinger {
            period,
            std_dev_multiplier,
        } => bollinger_reversion::generate(bars, period, std_dev_multiplier),
        StrategyParams::Macd {
            fast_span,
            slow_span,
            signal_span,
        } => macd_momentum::generate(bars, fast_span, slow_span, signal_span),
        StrategyParams::BuyAndHold => buy_and_hold::generate(bars),
    };
    Ok(signals)
}
