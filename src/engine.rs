//! Walk-forward rotation backtest engine.
//!
//! One decision per date: score every asset observed that day, hold the
//! top-scored asset for a single period, realize the return against the
//! *next* period's closing price, and compound the portfolio value. The
//! date loop is strictly sequential; only scoring within a single date may
//! run in parallel, and the selection ordering is total, so evaluation
//! order cannot change the pick.

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::PerformanceReport;
use crate::error::{KestrelError, Result};
use crate::panel::{build_panel, Panel, PriceTable};
use crate::rank::rank_panel;
use crate::signal::{SignalModel, SignalScorer};
use crate::types::{
    AssetSeries, PortfolioPoint, RankedRow, RunState, TieBreak, TradeRecord,
};

/// Configuration for a rotation backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Starting portfolio value.
    pub initial_capital: f64,
    /// Periods per year used to annualize the Sharpe ratio.
    pub periods_per_year: f64,
    /// Features ranked cross-sectionally and fed to the model, in order.
    pub features: Vec<String>,
    /// Ordering applied when two assets share the top score.
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Show a progress bar during the date loop.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_show_progress() -> bool {
    true
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            periods_per_year: 252.0,
            features: Vec::new(),
            tie_break: TieBreak::default(),
            show_progress: true,
        }
    }
}

/// Results from a rotation backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationResult {
    /// Model that produced the signals.
    pub model_name: String,
    /// Symbols in the universe.
    pub symbols: Vec<String>,
    /// Initial capital.
    pub initial_capital: f64,
    /// Final portfolio value.
    pub final_value: f64,
    /// Fractional total return.
    pub total_return: f64,
    /// Annualized Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Deepest drawdown, as a non-positive fraction.
    pub max_drawdown: f64,
    /// One record per simulated date, except the final date.
    pub trades: Vec<TradeRecord>,
    /// Portfolio value series, one point per transition.
    pub portfolio: Vec<PortfolioPoint>,
    /// First simulated date.
    pub start_date: NaiveDate,
    /// Last date in the panel (produces no trade).
    pub end_date: NaiveDate,
    /// Final state of the run's state machine.
    pub state: RunState,
    /// Unique run identifier.
    #[serde(default = "Uuid::new_v4")]
    pub run_id: Uuid,
}

/// The rotation backtest engine.
///
/// Owns the universe of asset series and, during a run, the portfolio state
/// and trade log; no other component mutates them.
pub struct RotationEngine {
    config: RotationConfig,
    universe: BTreeMap<String, AssetSeries>,
}

impl RotationEngine {
    /// Create a new engine.
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            universe: BTreeMap::new(),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RotationConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Add one asset's series to the universe, keyed by its symbol.
    pub fn add_series(&mut self, series: AssetSeries) {
        self.universe.insert(series.symbol.clone(), series);
    }

    /// Symbols currently in the universe.
    pub fn symbols(&self) -> Vec<String> {
        self.universe.keys().cloned().collect()
    }

    /// Run the backtest against the given model.
    pub fn run(&self, model: &dyn SignalModel) -> Result<RotationResult> {
        if self.universe.is_empty() {
            return Err(KestrelError::Data("no asset series loaded".to_string()));
        }

        let scorer = SignalScorer::new(model, &self.config.features)?;

        let Panel { rows, prices } = build_panel(&self.universe, &self.config.features);
        let ranked = rank_panel(rows, &self.config.features)?;

        let mut dates: Vec<NaiveDate> = ranked.iter().map(|r| r.date).collect();
        dates.sort_unstable();
        dates.dedup();
        if dates.len() < 2 {
            return Err(KestrelError::InsufficientHistory { dates: dates.len() });
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<&RankedRow>> = BTreeMap::new();
        for row in &ranked {
            by_date.entry(row.date).or_default().push(row);
        }

        info!(
            "Running rotation backtest: model '{}', {} assets, {} dates",
            model.name(),
            self.universe.len(),
            dates.len()
        );

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new((dates.len() - 1) as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut state = RunState::Initialized;
        let mut value = self.config.initial_capital;
        let mut trades = Vec::with_capacity(dates.len() - 1);
        let mut portfolio = Vec::with_capacity(dates.len() - 1);

        debug!("state transition: {} -> {}", state, RunState::Running);
        state = RunState::Running;

        for pair in dates.windows(2) {
            let (date, next_date) = (pair[0], pair[1]);

            let candidates = by_date.get(&date).ok_or_else(|| {
                KestrelError::Data(format!("no panel rows for date {}", date))
            })?;

            // Selection only sees this date's rows; next_date is touched
            // solely for the realization price below.
            let scored: Vec<(f64, &RankedRow)> = candidates
                .par_iter()
                .map(|row| scorer.score_row(row).map(|score| (score, *row)))
                .collect::<Result<_>>()?;

            let (score, pick) = scored
                .iter()
                .copied()
                .max_by(|a, b| self.compare_candidates(*a, *b))
                .ok_or_else(|| {
                    KestrelError::Data(format!("empty date group at {}", date))
                })?;

            let realized_return = self.realized_return(&prices, &pick.symbol, date, next_date);

            let value_before = value;
            value *= 1.0 + realized_return;

            debug!(
                "{}: hold {} (score {:.4}), return {:.4}, value {:.2}",
                date, pick.symbol, score, realized_return, value
            );

            trades.push(TradeRecord {
                date,
                symbol: pick.symbol.clone(),
                score,
                realized_return,
                value_before,
                value_after: value,
            });
            portfolio.push(PortfolioPoint { date, value });

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        debug!("state transition: {} -> {}", state, RunState::Completed);
        state = RunState::Completed;

        if let Some(pb) = progress {
            pb.finish_with_message("Backtest complete");
        }

        let report = PerformanceReport::from_series(
            self.config.initial_capital,
            &portfolio,
            self.config.periods_per_year,
        );

        info!(
            "Backtest complete: {:.2}% return, {:.2} Sharpe, {:.2}% max drawdown",
            report.total_return * 100.0,
            report.sharpe_ratio,
            report.max_drawdown * 100.0
        );

        Ok(RotationResult {
            model_name: model.name().to_string(),
            symbols: self.symbols(),
            initial_capital: self.config.initial_capital,
            final_value: report.final_value,
            total_return: report.total_return,
            sharpe_ratio: report.sharpe_ratio,
            max_drawdown: report.max_drawdown,
            trades,
            portfolio,
            start_date: dates[0],
            end_date: dates[dates.len() - 1],
            state,
            run_id: Uuid::new_v4(),
        })
    }

    /// Total ordering over scored candidates: higher score wins, exact ties
    /// fall through to the configured symbol ordering.
    fn compare_candidates(&self, a: (f64, &RankedRow), b: (f64, &RankedRow)) -> Ordering {
        match a.0.partial_cmp(&b.0) {
            Some(Ordering::Equal) | None => {
                self.config.tie_break.prefer(&a.1.symbol, &b.1.symbol)
            }
            Some(ordering) => ordering,
        }
    }

    /// Single-period return from live closing prices, guarded against
    /// degenerate prices: a zero, non-finite, or missing price realizes a
    /// flat step instead of a numeric fault.
    fn realized_return(
        &self,
        prices: &PriceTable,
        symbol: &str,
        date: NaiveDate,
        next_date: NaiveDate,
    ) -> f64 {
        let entry = prices.get(symbol, date);
        let exit = prices.get(symbol, next_date);
        match (entry, exit) {
            (Some(entry), Some(exit)) if entry > 0.0 && entry.is_finite() && exit.is_finite() => {
                (exit - entry) / entry
            }
            _ => {
                warn!(
                    "Degenerate or missing price for {} over {} -> {}; realizing flat step",
                    symbol, date, next_date
                );
                0.0
            }
        }
    }
}
