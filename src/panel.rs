//! Panel construction: merging per-asset series into one long-form table.
//!
//! The panel is the join point between the per-asset feature series handed
//! over by the data collaborators and the cross-sectional stages downstream.
//! Rows missing any configured feature or the forward-return label are
//! dropped here, consistently, rather than silently defaulting to zero.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::{AssetSeries, PanelRow};

/// Closing prices for every observed (symbol, date) pair.
///
/// Built from the raw series before any row is dropped, so the engine can
/// always resolve next-period prices even when a row fell out of the panel.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl PriceTable {
    /// Closing price of `symbol` on `date`, if observed.
    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.prices.get(symbol).and_then(|dates| dates.get(&date)).copied()
    }

    fn insert(&mut self, symbol: &str, date: NaiveDate, close: f64) {
        self.prices
            .entry(symbol.to_string())
            .or_default()
            .insert(date, close);
    }
}

/// A long-form panel: one row per (date, symbol), plus the full price table.
#[derive(Debug, Clone)]
pub struct Panel {
    /// Rows in (date, symbol) order.
    pub rows: Vec<PanelRow>,
    /// Prices for all observed records, including dropped rows.
    pub prices: PriceTable,
}

impl Panel {
    /// Sorted distinct dates present in the panel rows.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rows.iter().map(|r| r.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}

/// Merge per-asset series into a panel over the union of observed dates.
///
/// A row survives only if it carries a finite value for every feature in
/// `features` and a finite forward-return label. Drops are counted and
/// logged as a data-gap warning; the inputs are never mutated.
pub fn build_panel(universe: &BTreeMap<String, AssetSeries>, features: &[String]) -> Panel {
    let mut rows = Vec::new();
    let mut prices = PriceTable::default();
    let mut dropped = 0usize;

    for (symbol, series) in universe {
        for record in series.records() {
            prices.insert(symbol, record.date, record.close);

            let complete = features
                .iter()
                .all(|f| record.feature(f).is_some_and(|v| v.is_finite()));
            if !complete {
                dropped += 1;
                continue;
            }
            let Some(forward_return) = record.forward_return.filter(|r| r.is_finite()) else {
                dropped += 1;
                continue;
            };

            rows.push(PanelRow {
                date: record.date,
                symbol: symbol.clone(),
                close: record.close,
                features: record.features.clone(),
                forward_return,
            });
        }
    }

    rows.sort_by(|a, b| (a.date, &a.symbol).cmp(&(b.date, &b.symbol)));

    if dropped > 0 {
        warn!(
            "Dropped {} row(s) with missing features or labels during panel construction",
            dropped
        );
    }
    debug!(
        "Built panel: {} rows across {} assets",
        rows.len(),
        universe.len()
    );

    Panel { rows, prices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn record(day: u32, close: f64, momentum: f64) -> AssetRecord {
        AssetRecord::new(d(day), close)
            .with_feature("momentum", momentum)
            .with_forward_return(0.01)
    }

    fn universe(entries: Vec<AssetSeries>) -> BTreeMap<String, AssetSeries> {
        entries
            .into_iter()
            .map(|s| (s.symbol.clone(), s))
            .collect()
    }

    #[test]
    fn test_panel_joins_assets_over_dates() {
        let a = AssetSeries::new("A", vec![record(1, 100.0, 0.5), record(2, 110.0, 0.6)]).unwrap();
        let b = AssetSeries::new("B", vec![record(1, 50.0, 0.3), record(2, 45.0, 0.2)]).unwrap();

        let panel = build_panel(&universe(vec![a, b]), &["momentum".to_string()]);

        assert_eq!(panel.rows.len(), 4);
        assert_eq!(panel.dates(), vec![d(1), d(2)]);
        // Rows come out date-major, symbol-minor.
        assert_eq!(panel.rows[0].symbol, "A");
        assert_eq!(panel.rows[1].symbol, "B");
        assert_eq!(panel.rows[0].date, d(1));
        assert_eq!(panel.rows[2].date, d(2));
    }

    #[test]
    fn test_rows_missing_features_are_dropped() {
        let incomplete = AssetRecord::new(d(2), 110.0).with_forward_return(0.01);
        let a = AssetSeries::new("A", vec![record(1, 100.0, 0.5), incomplete]).unwrap();

        let panel = build_panel(&universe(vec![a]), &["momentum".to_string()]);

        assert_eq!(panel.rows.len(), 1);
        assert_eq!(panel.rows[0].date, d(1));
        // The dropped row's price is still resolvable.
        assert_eq!(panel.prices.get("A", d(2)), Some(110.0));
    }

    #[test]
    fn test_rows_missing_label_are_dropped() {
        let unlabeled = AssetRecord::new(d(2), 110.0).with_feature("momentum", 0.7);
        let a = AssetSeries::new("A", vec![record(1, 100.0, 0.5), unlabeled]).unwrap();

        let panel = build_panel(&universe(vec![a]), &["momentum".to_string()]);

        assert_eq!(panel.rows.len(), 1);
        assert_eq!(panel.dates(), vec![d(1)]);
    }

    #[test]
    fn test_non_finite_features_are_dropped() {
        let nan_row = record(2, 110.0, f64::NAN);
        let a = AssetSeries::new("A", vec![record(1, 100.0, 0.5), nan_row]).unwrap();

        let panel = build_panel(&universe(vec![a]), &["momentum".to_string()]);

        assert_eq!(panel.rows.len(), 1);
    }

    #[test]
    fn test_price_table_lookup() {
        let a = AssetSeries::new("A", vec![record(1, 100.0, 0.5)]).unwrap();
        let panel = build_panel(&universe(vec![a]), &["momentum".to_string()]);

        assert_eq!(panel.prices.get("A", d(1)), Some(100.0));
        assert_eq!(panel.prices.get("A", d(2)), None);
        assert_eq!(panel.prices.get("B", d(1)), None);
    }
}
