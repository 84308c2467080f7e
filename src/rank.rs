//! Cross-sectional normalization: per-date percentile ranks.
//!
//! Assets trade at wildly different scales, so raw feature values are not
//! comparable across the universe. Within each date group the normalizer
//! replaces every configured feature with its percentile rank among the
//! assets observed that day, which is the representation the model was
//! trained on.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{KestrelError, Result};
use crate::types::{PanelRow, RankedRow};

/// Percentile ranks of `values`, returned in input order.
///
/// Each value's rank is its average 1-based position in ascending order
/// divided by the group size: the highest value ranks 1.0, ties share the
/// average of their positions, and a single value ranks 1.0.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Average of the tied run's 1-based positions i+1..=j+1.
        let average = (i + j + 2) as f64 / 2.0;
        for &index in &order[i..=j] {
            ranks[index] = average / n as f64;
        }
        i = j + 1;
    }

    ranks
}

/// Replace each configured feature with its percentile rank across all
/// assets observed on the same date.
///
/// Produces one output row per input row; a date group that lost all of its
/// rows upstream simply does not appear. A row lacking one of the requested
/// features is a configuration error, since the panel builder guarantees
/// completeness for its own feature set.
pub fn rank_panel(rows: Vec<PanelRow>, features: &[String]) -> Result<Vec<RankedRow>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        by_date.entry(row.date).or_default().push(index);
    }

    let mut rank_maps: Vec<HashMap<String, f64>> = vec![HashMap::new(); rows.len()];
    for (date, indexes) in &by_date {
        for feature in features {
            let mut values = Vec::with_capacity(indexes.len());
            for &index in indexes {
                let row = &rows[index];
                let value = row.features.get(feature).copied().ok_or_else(|| {
                    KestrelError::Config(format!(
                        "feature '{}' missing from panel row {} on {}",
                        feature, row.symbol, date
                    ))
                })?;
                values.push(value);
            }

            for (&index, rank) in indexes.iter().zip(percentile_ranks(&values)) {
                rank_maps[index].insert(feature.clone(), rank);
            }
        }
    }

    debug!(
        "Ranked {} feature(s) across {} date group(s)",
        features.len(),
        by_date.len()
    );

    Ok(rows
        .into_iter()
        .zip(rank_maps)
        .map(|(row, ranks)| RankedRow {
            date: row.date,
            symbol: row.symbol,
            close: row.close,
            features: row.features,
            forward_return: row.forward_return,
            ranks,
        })
        .collect())
}
