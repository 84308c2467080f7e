//! Configuration file support for the rotation pipeline.
//!
//! All run settings live in one TOML file so a backtest is reproducible from
//! a single artifact: the asset universe and data location, the model
//! weights and feature set, and the backtest parameters.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::data::DataConfig;
use crate::engine::RotationConfig;
use crate::error::{KestrelError, Result};
use crate::types::TieBreak;

/// Complete pipeline configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationFileConfig {
    /// Data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Model settings.
    #[serde(default)]
    pub model: ModelSettings,
    /// Backtest settings.
    #[serde(default)]
    pub backtest: BacktestSettings,
}

/// Data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory holding one `<TICKER>.csv` per asset.
    #[serde(default = "default_data_dir")]
    pub dir: String,
    /// Asset universe.
    #[serde(default)]
    pub tickers: Vec<String>,
    /// Date parse format (defaults to `%Y-%m-%d`).
    #[serde(default)]
    pub date_format: Option<String>,
    /// CSV delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Header of the forward-return label column.
    #[serde(default = "default_label_column")]
    pub forward_return_column: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}
fn default_delimiter() -> char {
    ','
}
fn default_label_column() -> String {
    "fwd_return".to_string()
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            tickers: Vec::new(),
            date_format: None,
            delimiter: ',',
            forward_return_column: default_label_column(),
        }
    }
}

/// Model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Path to the JSON weight file exported by the training pipeline.
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Features to rank and feed to the model, in weight order.
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_model_path() -> String {
    "model/weights.json".to_string()
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            features: Vec::new(),
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Initial capital.
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// Periods per year for Sharpe annualization.
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    /// Tie-break ordering for equal top scores.
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Directory for result artifacts.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    /// Show a progress bar during the run.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_capital() -> f64 {
    100_000.0
}
fn default_periods_per_year() -> f64 {
    252.0
}
fn default_results_dir() -> String {
    "results".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            periods_per_year: 252.0,
            tie_break: TieBreak::default(),
            results_dir: default_results_dir(),
            show_progress: true,
        }
    }
}

impl RotationFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: RotationFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| KestrelError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to the engine's configuration.
    pub fn to_rotation_config(&self) -> RotationConfig {
        RotationConfig {
            initial_capital: self.backtest.initial_capital,
            periods_per_year: self.backtest.periods_per_year,
            features: self.model.features.clone(),
            tie_break: self.backtest.tie_break,
            show_progress: self.backtest.show_progress,
        }
    }

    /// Convert to the data loader's configuration.
    pub fn to_data_config(&self) -> DataConfig {
        DataConfig {
            date_format: self.data.date_format.clone(),
            delimiter: self.data.delimiter as u8,
            forward_return_column: self.data.forward_return_column.clone(),
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Kestrel rotation backtest configuration

[data]
dir = "data"
tickers = ["AAPL", "MSFT", "GOOG", "AMZN"]
# date_format = "%Y-%m-%d"
delimiter = ","
forward_return_column = "fwd_return"

[model]
path = "model/weights.json"
features = ["rsi_14", "macd", "bb_width"]

[backtest]
initial_capital = 100000.0
periods_per_year = 252.0
tie_break = "symbol-ascending"
results_dir = "results"
show_progress = true
"#
        .to_string()
    }
}
