//! Signal scoring: the seam to the externally trained classifier.
//!
//! The core never trains or persists a model. It sees the classifier only
//! through the [`SignalModel`] capability, which maps a normalized feature
//! vector to a probability-like score. That keeps the backtest testable with
//! deterministic stub models and keeps model tooling out of the simulation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{KestrelError, Result};
use crate::types::RankedRow;

/// External classifier capability.
///
/// `score` receives the percentile ranks of the configured features, in
/// configuration order, and returns a probability of an upward move.
pub trait SignalModel: Send + Sync {
    /// Model name for logging and result attribution.
    fn name(&self) -> &str;

    /// Score a feature vector; must return a finite value in [0, 1].
    fn score(&self, features: &[f64]) -> Result<f64>;
}

/// Adapter between ranked panel rows and the model capability.
///
/// Assembles each row's rank vector in the configured feature order and
/// validates the model's output. An absent model, an empty feature set, a
/// missing rank, or a degenerate score is a fatal configuration error:
/// trading on a defaulted signal would silently corrupt every downstream
/// trade.
pub struct SignalScorer<'a> {
    model: &'a dyn SignalModel,
    features: &'a [String],
}

impl<'a> SignalScorer<'a> {
    /// Create a scorer over the configured feature order.
    pub fn new(model: &'a dyn SignalModel, features: &'a [String]) -> Result<Self> {
        if features.is_empty() {
            return Err(KestrelError::Config(
                "no features configured for scoring".to_string(),
            ));
        }
        Ok(Self { model, features })
    }

    /// Score one ranked row.
    pub fn score_row(&self, row: &RankedRow) -> Result<f64> {
        let mut vector = Vec::with_capacity(self.features.len());
        for feature in self.features {
            let rank = row.rank(feature).ok_or_else(|| {
                KestrelError::Config(format!(
                    "missing rank for feature '{}' on {} {}",
                    feature, row.symbol, row.date
                ))
            })?;
            vector.push(rank);
        }

        let score = self.model.score(&vector)?;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(KestrelError::Config(format!(
                "model '{}' produced invalid score {} for {} on {}",
                self.model.name(),
                score,
                row.symbol,
                row.date
            )));
        }
        Ok(score)
    }
}

fn default_model_name() -> String {
    "logistic".to_string()
}

/// Logistic model over ranked features.
///
/// Imported from a JSON weight file exported by the external training
/// pipeline: `{ "name": ..., "weights": [...], "bias": ... }`. Weights line
/// up positionally with the configured feature order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self {
            name: default_model_name(),
            weights,
            bias,
        }
    }

    /// Load a weight file. A missing file is a configuration error, not an
    /// IO error: the run must not proceed without its model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            KestrelError::Config(format!(
                "model weights not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        let model: LogisticModel = serde_json::from_str(&content)?;
        info!(
            "Loaded model '{}' ({} weights) from {}",
            model.name,
            model.weights.len(),
            path.display()
        );
        Ok(model)
    }

    /// Save the weight file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl SignalModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.weights.len() {
            return Err(KestrelError::Config(format!(
                "model '{}' expects {} feature(s), got {}",
                self.name,
                self.weights.len(),
                features.len()
            )));
        }
        let z: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}
