//! Model traits and the linear baseline

use serde::{Deserialize, Serialize};

use super::training::{calculate_metrics, TrainingMatrix};
use super::{ModelMetadata, ModelType};
use crate::error::{ForecastError, Result};

/// Trait for fitted regression models
pub trait MLModel {
    /// Predict one value per feature row
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Predict a single value from one feature row
    fn predict(&self, features: &[f64]) -> Result<f64> {
        self.predict_batch(&[features.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Model("Model returned empty predictions".to_string()))
    }

    /// Get model type
    fn model_type(&self) -> ModelType {
        self.metadata().model_type
    }
}

/// Fits a training matrix into a model
pub trait ModelFactory {
    fn fit(&self, data: &TrainingMatrix) -> Result<Box<dyn MLModel>>;
}

/// Linear model with fixed coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub metadata: ModelMetadata,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    /// Model over `data`'s features; in-sample metrics are computed on `data`
    pub fn new(coefficients: Vec<f64>, intercept: f64, data: &TrainingMatrix) -> Result<Self> {
        let mut model = Self {
            metadata: ModelMetadata {
                model_type: ModelType::LinearRegression,
                trained_at: chrono::Utc::now(),
                training_samples: data.len(),
                validation_metrics: super::ValidationMetrics::new(0.0, 0.0, 0.0, 0.0),
                feature_names: data.feature_names().to_vec(),
            },
            coefficients,
            intercept,
        };
        let predictions = model.predict_batch(data.rows())?;
        model.metadata.validation_metrics = calculate_metrics(&predictions, data.targets())?;
        Ok(model)
    }

    fn evaluate(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(ForecastError::Model(format!(
                "Feature count mismatch: expected {}, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(&self.coefficients)
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept)
    }
}

impl MLModel for LinearRegressionModel {
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.evaluate(row)).collect()
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Fits a [`LinearRegressionModel`] with preset coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedLinear {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ModelFactory for FixedLinear {
    fn fit(&self, data: &TrainingMatrix) -> Result<Box<dyn MLModel>> {
        let model = LinearRegressionModel::new(self.coefficients.clone(), self.intercept, data)?;
        Ok(Box::new(model))
    }
}
