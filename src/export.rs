//! Result persistence for the reporting collaborators.
//!
//! The dashboard and any downstream tooling consume three artifacts: the
//! portfolio value series, the trade log, and the headline metrics. The
//! encodings here are plain row-oriented tables and a small JSON record;
//! anything richer is the consumer's concern.

use csv::Writer;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analytics::{ChartData, PerformanceReport};
use crate::engine::RotationResult;
use crate::error::Result;

/// Write the portfolio value series as a `date,value` table.
pub fn write_portfolio_csv(path: impl AsRef<Path>, result: &RotationResult) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["date", "value"])?;
    for point in &result.portfolio {
        writer.write_record([point.date.to_string(), format!("{:.2}", point.value)])?;
    }
    writer.flush()?;
    info!("Wrote portfolio series to {}", path.display());
    Ok(())
}

/// Write the trade log as a row-oriented table.
pub fn write_trade_log_csv(path: impl AsRef<Path>, result: &RotationResult) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "date",
        "symbol",
        "score",
        "realized_return",
        "value_before",
        "value_after",
    ])?;
    for trade in &result.trades {
        writer.write_record([
            trade.date.to_string(),
            trade.symbol.clone(),
            format!("{:.6}", trade.score),
            format!("{:.6}", trade.realized_return),
            format!("{:.2}", trade.value_before),
            format!("{:.2}", trade.value_after),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {} trade(s) to {}", result.trades.len(), path.display());
    Ok(())
}

/// Write the headline metrics as JSON.
pub fn write_metrics_json(path: impl AsRef<Path>, result: &RotationResult) -> Result<()> {
    let path = path.as_ref();
    let report = PerformanceReport {
        total_return: result.total_return,
        sharpe_ratio: result.sharpe_ratio,
        max_drawdown: result.max_drawdown,
        final_value: result.final_value,
    };
    fs::write(path, serde_json::to_string_pretty(&report)?)?;
    info!("Wrote metrics to {}", path.display());
    Ok(())
}

/// Write the display collaborator's chart payload as JSON.
pub fn write_chart_json(path: impl AsRef<Path>, result: &RotationResult) -> Result<()> {
    let path = path.as_ref();
    let charts = ChartData::from_result(result);
    fs::write(path, serde_json::to_string_pretty(&charts)?)?;
    info!("Wrote chart data to {}", path.display());
    Ok(())
}

/// Write every artifact under `dir`, creating it if needed.
pub fn write_all(dir: impl AsRef<Path>, result: &RotationResult) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_portfolio_csv(dir.join("portfolio_results.csv"), result)?;
    write_trade_log_csv(dir.join("trade_log.csv"), result)?;
    write_metrics_json(dir.join("metrics.json"), result)?;
    write_chart_json(dir.join("chart_data.json"), result)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PortfolioPoint, RunState, TradeRecord};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_result() -> RotationResult {
        RotationResult {
            model_name: "stub".to_string(),
            symbols: vec!["A".to_string(), "B".to_string()],
            initial_capital: 100_000.0,
            final_value: 110_000.0,
            total_return: 0.1,
            sharpe_ratio: 1.5,
            max_drawdown: -0.05,
            trades: vec![TradeRecord {
                date: d(1),
                symbol: "A".to_string(),
                score: 0.8,
                realized_return: 0.1,
                value_before: 100_000.0,
                value_after: 110_000.0,
            }],
            portfolio: vec![PortfolioPoint {
                date: d(1),
                value: 110_000.0,
            }],
            start_date: d(1),
            end_date: d(2),
            state: RunState::Completed,
            run_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_write_all_creates_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();

        write_all(dir.path(), &result).unwrap();

        for name in [
            "portfolio_results.csv",
            "trade_log.csv",
            "metrics.json",
            "chart_data.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
    }

    #[test]
    fn test_portfolio_csv_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.csv");

        write_portfolio_csv(&path, &sample_result()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("date,value"));
        assert_eq!(lines.next(), Some("2024-01-01,110000.00"));
    }

    #[test]
    fn test_trade_log_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");

        write_trade_log_csv(&path, &sample_result()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content
            .starts_with("date,symbol,score,realized_return,value_before,value_after"));
        assert!(content.contains("2024-01-01,A,0.800000,0.100000,100000.00,110000.00"));
    }

    #[test]
    fn test_metrics_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");

        write_metrics_json(&path, &sample_result()).unwrap();

        let report: PerformanceReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!((report.total_return - 0.1).abs() < 1e-12);
        assert!((report.final_value - 110_000.0).abs() < f64::EPSILON);
    }
}
