//! Performance analytics over the portfolio value series.
//!
//! Everything here is a pure function of the series (plus the initial
//! capital it continues from); nothing is stored between calls. The display
//! collaborator pulls its chart payloads from the same functions.

use chrono::NaiveDate;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{builder::Builder, settings::Style};

use crate::engine::RotationResult;
use crate::types::PortfolioPoint;

/// Summary risk/return metrics for a portfolio series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Fractional return from initial capital to final value.
    pub total_return: f64,
    /// Annualized Sharpe ratio of the period returns.
    pub sharpe_ratio: f64,
    /// Deepest decline from the running peak, as a non-positive fraction.
    pub max_drawdown: f64,
    /// Final portfolio value.
    pub final_value: f64,
}

impl PerformanceReport {
    /// Compute the report for a series continuing from `initial_capital`.
    pub fn from_series(
        initial_capital: f64,
        series: &[PortfolioPoint],
        periods_per_year: f64,
    ) -> Self {
        let final_value = series.last().map(|p| p.value).unwrap_or(initial_capital);
        let total_return = if initial_capital != 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };
        let returns = period_returns(initial_capital, series);

        Self {
            total_return,
            sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
            max_drawdown: max_drawdown(initial_capital, series),
            final_value,
        }
    }
}

/// Per-period returns of the value sequence continued from the initial
/// capital. The initial point itself yields no return.
pub fn period_returns(initial_capital: f64, series: &[PortfolioPoint]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(series.len());
    let mut previous = initial_capital;
    for point in series {
        if previous != 0.0 {
            returns.push((point.value - previous) / previous);
        } else {
            returns.push(0.0);
        }
        previous = point.value;
    }
    returns
}

/// Annualized Sharpe ratio.
///
/// Zero standard deviation (or an empty return set) yields 0 rather than an
/// infinity.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean: f64 = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance: f64 =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return 0.0;
    }

    (mean / std_dev) * periods_per_year.sqrt()
}

/// Drawdown at one point of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    pub drawdown: f64,
}

/// Decline from the running peak at each point, the peak seeded with the
/// initial capital. Values are non-positive fractions.
pub fn drawdown_curve(initial_capital: f64, series: &[PortfolioPoint]) -> Vec<DrawdownPoint> {
    let mut peak = initial_capital;
    series
        .iter()
        .map(|point| {
            peak = peak.max(point.value);
            let drawdown = if peak > 0.0 {
                point.value / peak - 1.0
            } else {
                0.0
            };
            DrawdownPoint {
                date: point.date,
                drawdown,
            }
        })
        .collect()
}

/// Deepest drawdown of the series; 0 for a non-decreasing series.
pub fn max_drawdown(initial_capital: f64, series: &[PortfolioPoint]) -> f64 {
    drawdown_curve(initial_capital, series)
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0_f64, f64::min)
}

/// Chart payload for the display collaborator: value-vs-date, drawdown-vs-
/// date, and the raw period returns for a histogram. Derived on request,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub equity_curve: Vec<PortfolioPoint>,
    pub drawdown: Vec<DrawdownPoint>,
    pub returns_histogram: Vec<f64>,
}

impl ChartData {
    /// Derive all display series from a result.
    pub fn from_result(result: &RotationResult) -> Self {
        Self {
            equity_curve: result.portfolio.clone(),
            drawdown: drawdown_curve(result.initial_capital, &result.portfolio),
            returns_histogram: period_returns(result.initial_capital, &result.portfolio),
        }
    }
}

/// Human-readable result rendering.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Format the headline metrics as a table.
    pub fn summary(result: &RotationResult) -> String {
        let rows = [
            ("Metric".to_string(), "Value".to_string()),
            ("Model".to_string(), result.model_name.clone()),
            ("Universe".to_string(), result.symbols.join(", ")),
            (
                "Period".to_string(),
                format!("{} to {}", result.start_date, result.end_date),
            ),
            ("Trades".to_string(), result.trades.len().to_string()),
            (
                "Initial capital".to_string(),
                format!("{:.2}", result.initial_capital),
            ),
            (
                "Final value".to_string(),
                format!("{:.2}", result.final_value),
            ),
            (
                "Total return".to_string(),
                Self::signed_pct(result.total_return),
            ),
            (
                "Sharpe ratio".to_string(),
                format!("{:.2}", result.sharpe_ratio),
            ),
            (
                "Max drawdown".to_string(),
                format!("{:.2}%", result.max_drawdown * 100.0),
            ),
        ];

        let mut builder = Builder::default();
        for (metric, value) in rows {
            builder.push_record([metric, value]);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        table.to_string()
    }

    fn signed_pct(value: f64) -> String {
        let text = format!("{:+.2}%", value * 100.0);
        if value >= 0.0 {
            text.green().to_string()
        } else {
            text.red().to_string()
        }
    }
}
