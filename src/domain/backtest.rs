//! Backtest simulation: signals to positions to trades to an equity curve.
//!
//! [`BacktestConfig`] carries the run parameters explicitly; there is no
//! ambient configuration.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::SigtestError;
use crate::domain::ledger::Ledger;
use crate::domain::metrics::{self, DrawdownInfo, Metrics};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{Position, Signal, derive_positions};
use crate::domain::strategy::{self, StrategyParams};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_COMMISSION: f64 = 0.001;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of traded value paid on every buy and every sell.
    pub commission: f64,
    /// Annual rate.
    pub risk_free_rate: f64,
    pub periods_per_year: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission: DEFAULT_COMMISSION,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            start_date: None,
            end_date: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SigtestError> {
        validate_account(self.initial_capital, self.commission)?;
        if !self.risk_free_rate.is_finite() || self.risk_free_rate <= -1.0 {
            return Err(SigtestError::configuration(
                "risk_free_rate",
                format!("must be a finite rate above -1, got {}", self.risk_free_rate),
            ));
        }
        if self.periods_per_year == 0 {
            return Err(SigtestError::configuration(
                "periods_per_year",
                "must be positive",
            ));
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(SigtestError::configuration(
                "start_date",
                format!("{start} is after end_date {end}"),
            )),
            _ => Ok(()),
        }
    }
}

fn validate_account(initial_capital: f64, commission: f64) -> Result<(), SigtestError> {
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(SigtestError::configuration(
            "initial_capital",
            format!("must be positive, got {initial_capital}"),
        ));
    }
    if !(0.0..1.0).contains(&commission) {
        return Err(SigtestError::configuration(
            "commission",
            format!("must be within [0, 1), got {commission}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// An executed fill. For buys `value` is the cash spent including
/// commission; for sells it is the net proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub equity_curve: Vec<f64>,
    pub returns: Vec<f64>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub trade_count: usize,
    pub final_equity: f64,
    /// Fraction, not percent.
    pub total_return: f64,
}

/// Simulates an all-in, all-out account following `signals` at each bar's
/// close.
///
/// Fails before touching any state if the account parameters are invalid or
/// the signal series does not line up with the prices.
pub fn run_backtest(
    prices: &PriceSeries,
    signals: &[Signal],
    initial_capital: f64,
    commission: f64,
) -> Result<BacktestResult, SigtestError> {
    validate_account(initial_capital, commission)?;
    if signals.len() != prices.len() {
        return Err(SigtestError::input_contract(format!(
            "{} signals for {} bars",
            signals.len(),
            prices.len()
        )));
    }

    let positions = derive_positions(signals);
    let mut ledger = Ledger::new(initial_capital);
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(prices.len());
    let mut previous = Position::Flat;

    for (i, (bar, &position)) in prices.bars().iter().zip(&positions).enumerate() {
        match (previous, position) {
            (Position::Flat, Position::Long) => {
                let (shares, spent) = ledger.buy_all(bar.close, commission);
                trades.push(Trade {
                    bar_index: i,
                    date: bar.date,
                    side: TradeSide::Buy,
                    price: bar.close,
                    shares,
                    value: spent,
                });
            }
            (Position::Long, Position::Flat) => {
                let (shares, proceeds) = ledger.sell_all(bar.close, commission);
                trades.push(Trade {
                    bar_index: i,
                    date: bar.date,
                    side: TradeSide::Sell,
                    price: bar.close,
                    shares,
                    value: proceeds,
                });
            }
            _ => {}
        }
        previous = position;

        let equity = ledger.equity(bar.close);
        if !equity.is_finite() || equity <= 0.0 {
            return Err(SigtestError::data_quality(format!(
                "equity became {equity} at bar {i} ({}), close {}",
                bar.date, bar.close
            )));
        }
        equity_curve.push(equity);
    }

    let returns = period_returns(&equity_curve);
    let final_equity = equity_curve.last().copied().unwrap_or(initial_capital);

    Ok(BacktestResult {
        trade_count: trades.len(),
        total_return: (final_equity - initial_capital) / initial_capital,
        equity_curve,
        returns,
        positions,
        trades,
        final_equity,
    })
}

/// Simple period returns; the first period is 0.
fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(equity_curve.windows(2).map(|w| (w[1] - w[0]) / w[0]))
        .take(equity_curve.len())
        .collect()
}

/// A complete signals, backtest and metrics pass for one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRun {
    pub strategy: String,
    pub params: StrategyParams,
    pub result: BacktestResult,
    pub metrics: Metrics,
    pub drawdown: DrawdownInfo,
}

pub fn run_strategy(
    prices: &PriceSeries,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<StrategyRun, SigtestError> {
    config.validate()?;
    let signals = strategy::generate_signals(prices, params)?;
    let result = run_backtest(prices, &signals, config.initial_capital, config.commission)?;
    let metrics = metrics::compute_all_metrics(
        &result.returns,
        &result.equity_curve,
        config.risk_free_rate,
        config.periods_per_year,
    );
    let drawdown = metrics::compute_drawdown(&result.equity_curve);
    Ok(StrategyRun {
        strategy: params.to_string(),
        params: params.clone(),
        result,
        metrics,
        drawdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signal::{Buy, Hold, Sell};

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let c = BacktestConfig::default();
        assert!((c.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!((c.commission - 0.001).abs() < f64::EPSILON);
        assert_eq!(c.periods_per_year, 252);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_values() {
        let bad = [
            BacktestConfig {
                commission: 1.0,
                ..BacktestConfig::default()
            },
            BacktestConfig {
                initial_capital: 0.0,
                ..BacktestConfig::default()
            },
            BacktestConfig {
                periods_per_year: 0,
                ..BacktestConfig::default()
            },
            BacktestConfig {
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                ..BacktestConfig::default()
            },
        ];
        for config in &bad {
            assert!(matches!(
                config.validate(),
                Err(SigtestError::Configuration { .. })
            ));
        }
    }

    #[test]
    fn no_signals_keeps_cash() {
        let prices = series(&[10.0, 12.0, 8.0]);
        let r = run_backtest(&prices, &[Hold; 3], 1_000.0, 0.01).unwrap();
        assert_eq!(r.equity_curve, vec![1_000.0; 3]);
        assert_eq!(r.returns, vec![0.0; 3]);
        assert_eq!(r.trade_count, 0);
        assert_eq!(r.total_return, 0.0);
    }

    #[test]
    fn buy_on_first_bar_pays_commission() {
        let prices = series(&[10.0, 20.0]);
        let r = run_backtest(&prices, &[Buy, Hold], 1_000.0, 0.01).unwrap();
        assert!((r.equity_curve[0] - 990.0).abs() < 1e-9);
        assert!((r.equity_curve[1] - 1_980.0).abs() < 1e-9);
        assert_eq!(r.trade_count, 1);
        assert_eq!(r.trades[0].side, TradeSide::Buy);
        assert_eq!(r.trades[0].bar_index, 0);
        assert!((r.trades[0].shares - 99.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_applies_commission_twice() {
        let prices = series(&[10.0, 10.0, 15.0, 12.0]);
        let r = run_backtest(&prices, &[Hold, Buy, Sell, Hold], 1_000.0, 0.01).unwrap();
        let expected = 1_000.0 * 0.99 * (15.0 / 10.0) * 0.99;
        assert!((r.final_equity - expected).abs() < 1e-9);
        assert!((r.equity_curve[3] - expected).abs() < 1e-9);
        assert_eq!(r.trade_count, 2);
        assert_eq!(r.trades[1].side, TradeSide::Sell);
        assert!((r.trades[1].value - expected).abs() < 1e-9);
        assert!((r.total_return - (expected - 1_000.0) / 1_000.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_buys_do_not_trade_again() {
        let prices = series(&[10.0, 11.0, 12.0, 13.0]);
        let r = run_backtest(&prices, &[Buy, Buy, Hold, Buy], 1_000.0, 0.0).unwrap();
        assert_eq!(r.trade_count, 1);
        assert!((r.final_equity - 1_300.0).abs() < 1e-9);
    }

    #[test]
    fn sell_while_flat_is_ignored() {
        let prices = series(&[10.0, 11.0]);
        let r = run_backtest(&prices, &[Sell, Sell], 1_000.0, 0.01).unwrap();
        assert_eq!(r.trade_count, 0);
        assert_eq!(r.positions, vec![Position::Flat, Position::Flat]);
    }

    #[test]
    fn returns_are_percent_changes() {
        let prices = series(&[10.0, 11.0, 9.9]);
        let r = run_backtest(&prices, &[Buy, Hold, Hold], 100.0, 0.0).unwrap();
        assert_eq!(r.returns[0], 0.0);
        assert!((r.returns[1] - 0.1).abs() < 1e-12);
        assert!((r.returns[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_input_contract_error() {
        let prices = series(&[10.0, 11.0, 12.0]);
        let err = run_backtest(&prices, &[Hold, Hold], 1_000.0, 0.0).unwrap_err();
        assert!(matches!(err, SigtestError::InputContract { .. }));
    }

    #[test]
    fn invalid_account_is_configuration_error() {
        let prices = series(&[10.0]);
        for (capital, commission) in [(0.0, 0.0), (-5.0, 0.0), (100.0, 1.0), (100.0, -0.1)] {
            let err = run_backtest(&prices, &[Hold], capital, commission).unwrap_err();
            assert!(matches!(err, SigtestError::Configuration { .. }));
        }
    }

    #[test]
    fn run_strategy_fills_metrics() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let prices = series(&closes);
        let run = run_strategy(&prices, &StrategyParams::BuyAndHold, &BacktestConfig::default())
            .unwrap();
        assert_eq!(run.strategy, "BuyAndHold");
        assert_eq!(run.result.trade_count, 1);
        assert_eq!(run.metrics.max_drawdown, 0.0);
        assert!(run.metrics.total_return > 0.0);
        assert_eq!(run.drawdown.trough_index, None);
    }
}
