//! Loading of pre-materialized per-asset feature series.
//!
//! Market-data retrieval and indicator computation belong to external
//! collaborators; this module only reads their finished output. The expected
//! shape is one CSV per asset: a date column, a closing price, any number of
//! numeric feature columns, and an optional forward-return label column.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{KestrelError, Result};
use crate::types::{AssetRecord, AssetSeries};

/// Configuration for parsing asset CSV files.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date parse format; defaults to `%Y-%m-%d`.
    pub date_format: Option<String>,
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Header of the forward-return label column.
    pub forward_return_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            delimiter: b',',
            forward_return_column: "fwd_return".to_string(),
        }
    }
}

/// Parse a cell as a float, treating empty and non-finite values as absent.
fn parse_cell(raw: &str, column: &str, line: usize) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| {
        KestrelError::Data(format!(
            "non-numeric value '{}' in column '{}' at line {}",
            raw, column, line
        ))
    })?;
    Ok(value.is_finite().then_some(value))
}

/// Load one asset's series from a CSV file.
///
/// Requires `date` and `close` header columns (case-insensitive); every
/// other column is read as a feature, except the configured forward-return
/// column. Missing cells leave the feature absent so the panel builder can
/// drop the row consistently.
pub fn load_asset_csv(
    path: impl AsRef<Path>,
    symbol: impl Into<String>,
    config: &DataConfig,
) -> Result<AssetSeries> {
    let path = path.as_ref();
    let symbol = symbol.into();
    let date_format = config.date_format.as_deref().unwrap_or("%Y-%m-%d");

    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let date_index = find("date").ok_or_else(|| {
        KestrelError::Data(format!("no 'date' column in {}", path.display()))
    })?;
    let close_index = find("close").ok_or_else(|| {
        KestrelError::Data(format!("no 'close' column in {}", path.display()))
    })?;
    let label_index = find(&config.forward_return_column);

    let mut records = Vec::new();
    for (row_number, row) in reader.records().enumerate() {
        let row = row?;
        let line = row_number + 2; // header is line 1

        let date_cell = row.get(date_index).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_cell, date_format)?;

        let close = parse_cell(row.get(close_index).unwrap_or_default(), "close", line)?
            .unwrap_or(f64::NAN);

        let mut record = AssetRecord::new(date, close);
        for (index, header) in headers.iter().enumerate() {
            if index == date_index || index == close_index {
                continue;
            }
            let Some(value) = parse_cell(row.get(index).unwrap_or_default(), header, line)?
            else {
                continue;
            };
            if Some(index) == label_index {
                record.forward_return = Some(value);
            } else {
                record.features.insert(header.to_string(), value);
            }
        }
        records.push(record);
    }

    let series = AssetSeries::new(symbol, records)?;
    info!(
        "Loaded {} record(s) for '{}' from {}",
        series.len(),
        series.symbol,
        path.display()
    );
    Ok(series)
}

/// Load a universe from per-ticker files `<dir>/<TICKER>.csv`.
///
/// A missing or empty ticker file is logged and skipped (the run proceeds
/// over the remaining assets); an entirely empty universe is an error.
pub fn load_universe(
    dir: impl AsRef<Path>,
    tickers: &[String],
    config: &DataConfig,
) -> Result<BTreeMap<String, AssetSeries>> {
    let dir = dir.as_ref();
    let mut universe = BTreeMap::new();

    for ticker in tickers {
        let path = dir.join(format!("{}.csv", ticker));
        if !path.exists() {
            warn!("No data file for '{}' at {}; skipping", ticker, path.display());
            continue;
        }
        let series = load_asset_csv(&path, ticker.clone(), config)?;
        if series.is_empty() {
            warn!("Data file for '{}' is empty; skipping", ticker);
            continue;
        }
        universe.insert(ticker.clone(), series);
    }

    if universe.is_empty() {
        return Err(KestrelError::Data(format!(
            "no usable asset data found under {}",
            dir.display()
        )));
    }
    Ok(universe)
}
