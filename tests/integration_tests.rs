//! Integration tests for the rotation backtester.

use chrono::NaiveDate;
use kestrel::data::{load_asset_csv, DataConfig};
use kestrel::engine::{RotationConfig, RotationEngine};
use kestrel::error::KestrelError;
use kestrel::signal::{LogisticModel, SignalModel};
use kestrel::types::{AssetRecord, AssetSeries, RunState};
use kestrel::{export, Result};
use std::io::Write;

/// Scores a row by the rank of its first configured feature.
struct RankFollower;

impl SignalModel for RankFollower {
    fn name(&self) -> &str {
        "rank-follower"
    }

    fn score(&self, features: &[f64]) -> Result<f64> {
        Ok(features[0])
    }
}

/// A model that violates the [0, 1] contract.
struct BrokenModel;

impl SignalModel for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    fn score(&self, _features: &[f64]) -> Result<f64> {
        Ok(1.5)
    }
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn series(symbol: &str, rows: &[(u32, f64, f64)]) -> AssetSeries {
    let records = rows
        .iter()
        .map(|&(day, close, momentum)| {
            AssetRecord::new(d(day), close)
                .with_feature("momentum", momentum)
                .with_forward_return(0.0)
        })
        .collect();
    AssetSeries::new(symbol, records).unwrap()
}

fn momentum_config() -> RotationConfig {
    RotationConfig {
        features: vec!["momentum".to_string()],
        show_progress: false,
        ..Default::default()
    }
}

#[test]
fn test_worked_rotation_example() {
    // A compounds 10% a day, B loses 10% a day, and the model always ranks
    // A on top: two trades in A, no drawdown.
    let mut engine = RotationEngine::new(momentum_config());
    engine.add_series(series(
        "A",
        &[(1, 100.0, 0.9), (2, 110.0, 0.9), (3, 121.0, 0.9)],
    ));
    engine.add_series(series(
        "B",
        &[(1, 100.0, 0.1), (2, 90.0, 0.1), (3, 81.0, 0.1)],
    ));

    let result = engine.run(&RankFollower).unwrap();

    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.portfolio.len(), 2);

    let day1 = &result.trades[0];
    assert_eq!(day1.date, d(1));
    assert_eq!(day1.symbol, "A");
    assert!((day1.realized_return - 0.10).abs() < 1e-12);
    assert!((day1.value_before - 100_000.0).abs() < 1e-9);
    assert!((day1.value_after - 110_000.0).abs() < 1e-9);

    let day2 = &result.trades[1];
    assert_eq!(day2.symbol, "A");
    assert!((day2.value_after - 121_000.0).abs() < 1e-9);

    assert!((result.total_return - 0.21).abs() < 1e-12);
    assert_eq!(result.max_drawdown, 0.0);
    // Two identical period returns have zero spread; the Sharpe guard
    // reports 0 rather than an infinity.
    assert_eq!(result.sharpe_ratio, 0.0);
}

#[test]
fn test_single_date_reports_insufficient_history() {
    let mut engine = RotationEngine::new(momentum_config());
    engine.add_series(series("A", &[(1, 100.0, 0.9)]));
    engine.add_series(series("B", &[(1, 50.0, 0.1)]));

    let err = engine.run(&RankFollower).unwrap_err();
    assert!(matches!(err, KestrelError::InsufficientHistory { dates: 1 }));
}

#[test]
fn test_incomplete_date_group_is_dropped() {
    // Day 2 only has an unlabeled, featureless record, so the whole date
    // drops out and day 1's trade realizes against day 3 prices.
    let a = AssetSeries::new(
        "A",
        vec![
            AssetRecord::new(d(1), 100.0)
                .with_feature("momentum", 0.9)
                .with_forward_return(0.0),
            AssetRecord::new(d(2), 105.0),
            AssetRecord::new(d(3), 120.0)
                .with_feature("momentum", 0.9)
                .with_forward_return(0.0),
        ],
    )
    .unwrap();

    let mut engine = RotationEngine::new(momentum_config());
    engine.add_series(a);

    let result = engine.run(&RankFollower).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].date, d(1));
    assert!((result.trades[0].realized_return - 0.20).abs() < 1e-12);
    assert_eq!(result.end_date, d(3));
}

#[test]
fn test_selection_ignores_future_features() {
    // Two universes identical up to day 2, with day 3's features flipped:
    // every trade decision happens before day 3's features exist, so the
    // trade logs must match exactly.
    let run = |final_day_momentum: (f64, f64)| {
        let mut engine = RotationEngine::new(momentum_config());
        engine.add_series(series(
            "A",
            &[
                (1, 100.0, 0.9),
                (2, 110.0, 0.2),
                (3, 121.0, final_day_momentum.0),
            ],
        ));
        engine.add_series(series(
            "B",
            &[
                (1, 100.0, 0.1),
                (2, 90.0, 0.8),
                (3, 81.0, final_day_momentum.1),
            ],
        ));
        engine.run(&RankFollower).unwrap()
    };

    let first = run((0.9, 0.1));
    let second = run((0.1, 0.9));

    assert_eq!(first.trades, second.trades);
    assert_eq!(first.portfolio, second.portfolio);
}

#[test]
fn test_earlier_decisions_unaffected_by_later_features() {
    // Flipping day 2's features may change day 2's pick, but day 1's trade
    // is already sealed.
    let run = |day2_momentum: (f64, f64)| {
        let mut engine = RotationEngine::new(momentum_config());
        engine.add_series(series(
            "A",
            &[(1, 100.0, 0.9), (2, 110.0, day2_momentum.0), (3, 121.0, 0.5)],
        ));
        engine.add_series(series(
            "B",
            &[(1, 100.0, 0.1), (2, 90.0, day2_momentum.1), (3, 81.0, 0.5)],
        ));
        engine.run(&RankFollower).unwrap()
    };

    let first = run((0.9, 0.1));
    let second = run((0.1, 0.9));

    assert_eq!(first.trades[0], second.trades[0]);
    assert_ne!(first.trades[1].symbol, second.trades[1].symbol);
}

#[test]
fn test_degenerate_score_aborts_run() {
    let mut engine = RotationEngine::new(momentum_config());
    engine.add_series(series("A", &[(1, 100.0, 0.9), (2, 110.0, 0.9)]));

    let err = engine.run(&BrokenModel).unwrap_err();
    assert!(matches!(err, KestrelError::Config(_)));
}

#[test]
fn test_csv_to_results_pipeline() {
    let dir = tempfile::tempdir().unwrap();

    // Two assets: momentum favors UP, which rallies; DOWN sells off.
    let up = "\
date,close,momentum,fwd_return
2024-01-02,100.0,5.0,0.02
2024-01-03,102.0,6.0,0.02
2024-01-04,104.0,7.0,0.02
2024-01-05,106.0,8.0,0.02
";
    let down = "\
date,close,momentum,fwd_return
2024-01-02,50.0,-5.0,-0.02
2024-01-03,49.0,-6.0,-0.02
2024-01-04,48.0,-7.0,-0.02
2024-01-05,47.0,-8.0,-0.02
";
    for (name, content) in [("UP.csv", up), ("DOWN.csv", down)] {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        write!(file, "{}", content).unwrap();
    }

    let data_config = DataConfig::default();
    let mut engine = RotationEngine::new(RotationConfig {
        features: vec!["momentum".to_string()],
        show_progress: false,
        ..Default::default()
    });
    for symbol in ["UP", "DOWN"] {
        let path = dir.path().join(format!("{}.csv", symbol));
        engine.add_series(load_asset_csv(path, symbol, &data_config).unwrap());
    }

    // A positive weight on the momentum rank keeps UP on top every day.
    let model = LogisticModel::new(vec![2.0], -1.0);
    let result = engine.run(&model).unwrap();

    assert_eq!(result.trades.len(), 3);
    assert!(result.trades.iter().all(|t| t.symbol == "UP"));
    assert!(result.total_return > 0.0);

    let results_dir = dir.path().join("results");
    export::write_all(&results_dir, &result).unwrap();

    let portfolio = std::fs::read_to_string(results_dir.join("portfolio_results.csv")).unwrap();
    // Header plus one row per transition.
    assert_eq!(portfolio.lines().count(), 4);
    assert!(std::fs::read_to_string(results_dir.join("trade_log.csv"))
        .unwrap()
        .contains("UP"));
}

#[test]
fn test_rotation_switches_holdings() {
    // Momentum leadership flips mid-run; the backtest must follow it.
    let mut engine = RotationEngine::new(momentum_config());
    engine.add_series(series(
        "A",
        &[(1, 100.0, 0.9), (2, 110.0, 0.1), (3, 105.0, 0.1)],
    ));
    engine.add_series(series(
        "B",
        &[(1, 50.0, 0.1), (2, 52.0, 0.9), (3, 56.0, 0.9)],
    ));

    let result = engine.run(&RankFollower).unwrap();

    assert_eq!(result.trades[0].symbol, "A");
    assert_eq!(result.trades[1].symbol, "B");
    // Day 2's trade realizes B's move from 52 to 56.
    assert!((result.trades[1].realized_return - (56.0 - 52.0) / 52.0).abs() < 1e-12);
}
