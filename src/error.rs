//! Error types for the rotation backtester.

use thiserror::Error;

/// Main error type for the rotation backtester.
#[derive(Error, Debug)]
pub enum KestrelError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Insufficient history: {dates} usable date(s) after panel construction, need at least 2")]
    InsufficientHistory { dates: usize },

    #[error("Data error: {0}")]
    Data(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for backtest operations.
pub type Result<T> = std::result::Result<T, KestrelError>;
