//! Kestrel - a cross-sectional rotation backtester for ML trading signals.
//!
//! # Overview
//!
//! Kestrel simulates a single-asset rotation strategy: each trading day it
//! ranks every asset's features against its peers, scores the ranked rows
//! with a pre-trained classifier, holds the top-scored asset for one period,
//! and compounds the realized return into a portfolio value series. The
//! pipeline is careful about the things that quietly ruin backtests:
//!
//! - **No lookahead**: selection at a date only sees that date's data;
//!   returns are realized against the *next* period's closing price
//! - **Cross-sectional ranks**: features are compared as percentile ranks
//!   within each date, so assets of different scales are commensurable
//! - **Consistent gap handling**: incomplete rows are dropped with a
//!   warning, never silently defaulted
//! - **Deterministic selection**: exact score ties resolve through a
//!   configured ordering, never iteration order
//!
//! # Quick Start
//!
//! ```no_run
//! use kestrel::data::{load_asset_csv, DataConfig};
//! use kestrel::engine::{RotationConfig, RotationEngine};
//! use kestrel::signal::LogisticModel;
//!
//! let config = RotationConfig {
//!     features: vec!["rsi_14".to_string(), "macd".to_string()],
//!     ..Default::default()
//! };
//! let mut engine = RotationEngine::new(config);
//!
//! let series = load_asset_csv("data/AAPL.csv", "AAPL", &DataConfig::default()).unwrap();
//! engine.add_series(series);
//!
//! let model = LogisticModel::load("model/weights.json").unwrap();
//! let result = engine.run(&model).unwrap();
//!
//! println!("Return: {:.2}%", result.total_return * 100.0);
//! println!("Sharpe: {:.2}", result.sharpe_ratio);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core data types (AssetSeries, PanelRow, TradeRecord)
//! - [`data`]: Loading of pre-materialized per-asset feature series
//! - [`panel`]: Panel construction over (date, asset)
//! - [`rank`]: Cross-sectional percentile normalization
//! - [`signal`]: The classifier seam and scoring adapter
//! - [`engine`]: The walk-forward rotation backtest
//! - [`analytics`]: Performance metrics and display series
//! - [`export`]: Result persistence for the reporting collaborators
//! - [`config`]: TOML configuration file support

pub mod analytics;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod panel;
pub mod rank;
pub mod signal;
pub mod types;

// Re-exports for convenience
pub use analytics::{
    drawdown_curve, max_drawdown, period_returns, sharpe_ratio, ChartData, DrawdownPoint,
    PerformanceReport, ResultFormatter,
};
pub use config::RotationFileConfig;
pub use data::{load_asset_csv, load_universe, DataConfig};
pub use engine::{RotationConfig, RotationEngine, RotationResult};
pub use error::{KestrelError, Result};
pub use panel::{build_panel, Panel, PriceTable};
pub use rank::{percentile_ranks, rank_panel};
pub use signal::{LogisticModel, SignalModel, SignalScorer};
pub use types::{
    AssetRecord, AssetSeries, PanelRow, PortfolioPoint, RankedRow, RunState, TieBreak, TradeRecord,
};
