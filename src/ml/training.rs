//! Training data and in-sample evaluation

use serde::{Deserialize, Serialize};

use super::ValidationMetrics;
use crate::error::{ForecastError, Result};

/// Feature rows with their targets, one row per training period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMatrix {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingMatrix {
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(ForecastError::Model(format!(
                "Feature and target count mismatch: {} rows, {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(ForecastError::Model(format!(
                "Feature row has {} values, expected {}",
                row.len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            rows,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }
}

/// Calculate validation metrics
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        return Err(ForecastError::Model(
            "Prediction and target count mismatch".to_string(),
        ));
    }

    if predictions.is_empty() {
        return Err(ForecastError::Model("No predictions to evaluate".to_string()));
    }

    let n = predictions.len() as f64;

    let mae: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    let mse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Detrended targets cross zero, so near-zero targets are skipped here
    let scored: Vec<f64> = predictions
        .iter()
        .zip(targets)
        .filter(|(_, t)| t.abs() > 1e-10)
        .map(|(p, t)| ((p - t) / t).abs() * 100.0)
        .collect();
    let mape = if scored.is_empty() {
        f64::NAN
    } else {
        scored.iter().sum::<f64>() / scored.len() as f64
    };

    let mean_target: f64 = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics::new(mae, rmse, mape, r2))
}
