//! Risk and performance metrics over a returns series and an equity curve.
//!
//! NaN values are dropped from both inputs once, up front. Degenerate inputs
//! (no volatility, no drawdown, no losses) map to fixed fallback values; no
//! metric is ever NaN or infinite.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::indicator::stddev::sample_stddev;

/// Reported instead of an infinite profit factor when there are no losses.
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

pub const METRIC_NAMES: [&str; 10] = [
    "total_return",
    "annualized_return",
    "sharpe_ratio",
    "sortino_ratio",
    "max_drawdown",
    "max_drawdown_duration",
    "calmar_ratio",
    "volatility",
    "win_rate",
    "profit_factor",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Percent.
    pub total_return: f64,
    /// CAGR, percent.
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Raw negative fraction, e.g. -0.25 for a 25% drawdown.
    pub max_drawdown: f64,
    /// Bars from the peak to the trough of the deepest drawdown.
    pub max_drawdown_duration: usize,
    pub calmar_ratio: f64,
    pub volatility: f64,
    /// Percent of periods with a positive return.
    pub win_rate: f64,
    pub profit_factor: f64,
}

impl Metrics {
    /// Looks a metric up by its name.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "total_return" => self.total_return,
            "annualized_return" => self.annualized_return,
            "sharpe_ratio" => self.sharpe_ratio,
            "sortino_ratio" => self.sortino_ratio,
            "max_drawdown" => self.max_drawdown,
            "max_drawdown_duration" => self.max_drawdown_duration as f64,
            "calmar_ratio" => self.calmar_ratio,
            "volatility" => self.volatility,
            "win_rate" => self.win_rate,
            "profit_factor" => self.profit_factor,
            _ => return None,
        };
        Some(value)
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        METRIC_NAMES
            .iter()
            .filter_map(|&name| self.get(name).map(|v| (name, v)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownInfo {
    pub max_drawdown: f64,
    pub duration: usize,
    /// Index of the highest equity before the trough, if there was a drawdown.
    /// Both indices count positions in the curve after NaN entries are
    /// dropped, so they shift left of the raw index past any NaN.
    pub peak_index: Option<usize>,
    pub trough_index: Option<usize>,
}

impl DrawdownInfo {
    fn none() -> Self {
        DrawdownInfo {
            max_drawdown: 0.0,
            duration: 0,
            peak_index: None,
            trough_index: None,
        }
    }
}

pub fn compute_all_metrics(
    returns: &[f64],
    equity_curve: &[f64],
    risk_free_rate: f64,
    periods_per_year: u32,
) -> Metrics {
    let returns = drop_nan(returns);
    let equity = drop_nan(equity_curve);
    let drawdown = drawdown_from_clean(&equity);

    let sharpe_ratio = sharpe(&returns, risk_free_rate, periods_per_year);
    Metrics {
        total_return: total_return(&equity),
        annualized_return: annualized_return(&equity, periods_per_year),
        sharpe_ratio,
        sortino_ratio: sortino(&returns, risk_free_rate, periods_per_year, sharpe_ratio),
        max_drawdown: drawdown.max_drawdown,
        max_drawdown_duration: drawdown.duration,
        calmar_ratio: calmar(&returns, drawdown.max_drawdown, periods_per_year),
        volatility: volatility(&returns, periods_per_year),
        win_rate: win_rate(&returns),
        profit_factor: profit_factor(&returns),
    }
}

/// Deepest peak-to-trough decline of an equity curve. NaN entries are
/// dropped first and the reported indices refer to the filtered curve.
pub fn compute_drawdown(equity_curve: &[f64]) -> DrawdownInfo {
    drawdown_from_clean(&drop_nan(equity_curve))
}

fn drop_nan(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn per_period_risk_free(risk_free_rate: f64, periods_per_year: u32) -> f64 {
    (1.0 + risk_free_rate).powf(1.0 / periods_per_year as f64) - 1.0
}

fn risk_adjusted(mean: f64, deviation: Option<f64>, risk_free_rate: f64, periods_per_year: u32) -> f64 {
    match deviation {
        Some(sd) if sd > 0.0 && sd.is_finite() => {
            let ratio = (mean - per_period_risk_free(risk_free_rate, periods_per_year)) / sd
                * (periods_per_year as f64).sqrt();
            finite_or_zero(ratio)
        }
        _ => 0.0,
    }
}

fn sharpe(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    match mean(returns) {
        Some(m) => risk_adjusted(m, sample_stddev(returns), risk_free_rate, periods_per_year),
        None => 0.0,
    }
}

fn sortino(returns: &[f64], risk_free_rate: f64, periods_per_year: u32, sharpe_ratio: f64) -> f64 {
    let Some(m) = mean(returns) else {
        return 0.0;
    };
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return sharpe_ratio;
    }
    risk_adjusted(m, sample_stddev(&downside), risk_free_rate, periods_per_year)
}

fn drawdown_from_clean(equity: &[f64]) -> DrawdownInfo {
    let mut running_max = f64::NEG_INFINITY;
    let mut trough: Option<(usize, f64)> = None;

    for (i, &value) in equity.iter().enumerate() {
        running_max = running_max.max(value);
        if running_max == 0.0 {
            continue;
        }
        let dd = (value - running_max) / running_max;
        if !dd.is_finite() {
            continue;
        }
        if trough.is_none_or(|(_, worst)| dd < worst) {
            trough = Some((i, dd));
        }
    }

    let Some((trough_index, max_drawdown)) = trough else {
        return DrawdownInfo::none();
    };
    if trough_index == 0 || max_drawdown == 0.0 {
        return DrawdownInfo {
            max_drawdown: 0.0,
            ..DrawdownInfo::none()
        };
    }

    // first occurrence of the highest value before the trough
    let peak_index = equity[..trough_index]
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > equity[best] { i } else { best });

    DrawdownInfo {
        max_drawdown,
        duration: trough_index - peak_index,
        peak_index: Some(peak_index),
        trough_index: Some(trough_index),
    }
}

fn calmar(returns: &[f64], max_drawdown: f64, periods_per_year: u32) -> f64 {
    let Some(m) = mean(returns) else {
        return 0.0;
    };
    if max_drawdown == 0.0 {
        return 0.0;
    }
    finite_or_zero(m * periods_per_year as f64 / max_drawdown.abs())
}

fn volatility(returns: &[f64], periods_per_year: u32) -> f64 {
    sample_stddev(returns)
        .map(|sd| finite_or_zero(sd * (periods_per_year as f64).sqrt()))
        .unwrap_or(0.0)
}

fn win_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    wins as f64 / returns.len() as f64 * 100.0
}

fn profit_factor(returns: &[f64]) -> f64 {
    let gains: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let losses: f64 = returns.iter().filter(|r| **r < 0.0).sum::<f64>().abs();
    if losses == 0.0 {
        return if gains > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    if gains == 0.0 {
        return 0.0;
    }
    finite_or_zero(gains / losses)
}

fn total_return(equity: &[f64]) -> f64 {
    if equity.len() < 2 || equity[0] == 0.0 {
        return 0.0;
    }
    let first = equity[0];
    let last = equity[equity.len() - 1];
    finite_or_zero((last - first) / first * 100.0)
}

fn annualized_return(equity: &[f64], periods_per_year: u32) -> f64 {
    if equity.len() < 2 || equity[0] == 0.0 || periods_per_year == 0 {
        return 0.0;
    }
    let first = equity[0];
    let last = equity[equity.len() - 1];
    let years = (equity.len() - 1) as f64 / periods_per_year as f64;
    finite_or_zero(((last / first).powf(1.0 / years) - 1.0) * 100.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
