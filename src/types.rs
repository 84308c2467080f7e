//! Core data types for the rotation backtester.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{KestrelError, Result};

/// One observation of a single asset: a date, a closing price, named feature
/// values, and the optional forward-return label produced by the external
/// feature pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub features: HashMap<String, f64>,
    pub forward_return: Option<f64>,
}

impl AssetRecord {
    /// Create a record with no features and no forward-return label.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            features: HashMap::new(),
            forward_return: None,
        }
    }

    /// Attach a named feature value.
    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    /// Attach the forward-return label.
    pub fn with_forward_return(mut self, forward_return: f64) -> Self {
        self.forward_return = Some(forward_return);
        self
    }

    /// Look up a feature value by name.
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

/// A time-ordered sequence of records for one asset.
///
/// The constructor enforces the series invariant: dates strictly increasing,
/// no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub symbol: String,
    records: Vec<AssetRecord>,
}

impl AssetSeries {
    /// Create a series, validating that record dates strictly increase.
    pub fn new(symbol: impl Into<String>, records: Vec<AssetRecord>) -> Result<Self> {
        let symbol = symbol.into();
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(KestrelError::Data(format!(
                    "series '{}' has non-increasing dates: {} then {}",
                    symbol, pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { symbol, records })
    }

    /// The records in date order.
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First observed date, if any.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    /// Last observed date, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

/// One row of the long-form panel, keyed by (date, symbol).
///
/// The panel builder only emits rows that carry every configured feature and
/// a forward-return label; incomplete rows are dropped upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub close: f64,
    pub features: HashMap<String, f64>,
    pub forward_return: f64,
}

/// A panel row extended with cross-sectional percentile ranks.
///
/// Rank values lie in (0, 1]; the highest raw value on a date ranks 1.0 and
/// ties share the average of their positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub close: f64,
    pub features: HashMap<String, f64>,
    pub forward_return: f64,
    pub ranks: HashMap<String, f64>,
}

impl RankedRow {
    /// Look up a feature's percentile rank by name.
    pub fn rank(&self, feature: &str) -> Option<f64> {
        self.ranks.get(feature).copied()
    }
}

/// One simulated holding period: the asset picked on `date`, the score that
/// picked it, and the portfolio value across the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub score: f64,
    pub realized_return: f64,
    pub value_before: f64,
    pub value_after: f64,
}

/// Portfolio value at the end of one simulated step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Lifecycle of a rotation backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Initialized,
    Running,
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Initialized => write!(f, "initialized"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
        }
    }
}

/// Secondary ordering applied when two assets share the top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Prefer the lexicographically smallest symbol.
    #[default]
    SymbolAscending,
    /// Prefer the lexicographically largest symbol.
    SymbolDescending,
}

impl TieBreak {
    /// Ordering for max-selection: the preferred symbol compares greater.
    pub fn prefer(&self, a: &str, b: &str) -> std::cmp::Ordering {
        match self {
            TieBreak::SymbolAscending => b.cmp(a),
            TieBreak::SymbolDescending => a.cmp(b),
        }
    }
}
