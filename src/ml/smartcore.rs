//! SmartCore random forest regressor
//!
//! Wraps smartcore's `RandomForestRegressor` behind [`MLModel`]. With a
//! fixed seed the fitted forest, and therefore every forecast, is
//! reproducible across runs.

use ::smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use ::smartcore::linalg::basic::matrix::DenseMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{MLModel, ModelFactory};
use super::training::{calculate_metrics, TrainingMatrix};
use super::{ModelMetadata, ModelType};
use crate::error::{ForecastError, Result};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` considers all of them
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(ForecastError::Configuration(
                "model.n_trees must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::Configuration(format!(
                "model.min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::Configuration(
                "model.min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ForecastError::Configuration(
                "model.max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// smartcore parameters for a matrix with `n_features` columns
    pub fn to_smartcore(&self, n_features: usize) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            n_trees: self.n_trees,
            m: Some(self.max_features.unwrap_or(n_features).min(n_features)),
            keep_samples: false,
            seed: self.seed,
        }
    }
}

impl ModelFactory for ForestParams {
    fn fit(&self, data: &TrainingMatrix) -> Result<Box<dyn MLModel>> {
        Ok(Box::new(SmartcoreRandomForest::train(data, self)?))
    }
}

/// Fitted random forest
#[derive(Debug)]
pub struct SmartcoreRandomForest {
    pub metadata: ModelMetadata,
    model: Forest,
    n_features: usize,
}

impl SmartcoreRandomForest {
    /// Fit a forest on `data` and score it in-sample
    pub fn train(data: &TrainingMatrix, params: &ForestParams) -> Result<Self> {
        if data.is_empty() {
            return Err(ForecastError::Model(
                "Cannot train on empty dataset".to_string(),
            ));
        }
        params.validate()?;

        let n_samples = data.len();
        let n_features = data.n_features();
        let x = to_matrix(data.rows(), n_features)?;
        let y = data.targets().to_vec();

        let model = Forest::fit(&x, &y, params.to_smartcore(n_features))
            .map_err(|e| ForecastError::Model(format!("RandomForest training failed: {:?}", e)))?;

        let predictions = model
            .predict(&x)
            .map_err(|e| ForecastError::Model(format!("Prediction failed during validation: {:?}", e)))?;
        let metrics = calculate_metrics(&predictions, data.targets())?;

        debug!(
            samples = n_samples,
            features = n_features,
            trees = params.n_trees,
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "random forest fitted"
        );

        Ok(Self {
            metadata: ModelMetadata {
                model_type: ModelType::RandomForest,
                trained_at: chrono::Utc::now(),
                training_samples: n_samples,
                validation_metrics: metrics,
                feature_names: data.feature_names().to_vec(),
            },
            model,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl MLModel for SmartcoreRandomForest {
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let x = to_matrix(rows, self.n_features)?;
        self.model
            .predict(&x)
            .map_err(|e| ForecastError::Model(format!("Prediction failed: {:?}", e)))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Row-major dense matrix; every row must have `n_features` values
fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<DenseMatrix<f64>> {
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        if row.len() != n_features {
            return Err(ForecastError::Model(format!(
                "Feature count mismatch: expected {}, got {}",
                n_features,
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok(DenseMatrix::new(rows.len(), n_features, flat, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> TrainingMatrix {
        // y = 2x1 + 3x2
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 8) as f64, (i / 8) as f64])
            .collect();
        let targets = rows.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        TrainingMatrix::new(vec!["x1".to_string(), "x2".to_string()], rows, targets).unwrap()
    }

    #[test]
    fn test_default_parameters() {
        let params = ForestParams::default();
        assert_eq!(params.n_trees, 100);
        assert_eq!(params.max_depth, None);
        assert_eq!(params.seed, 42);

        let smartcore = params.to_smartcore(13);
        assert_eq!(smartcore.m, Some(13));
        assert!(!smartcore.keep_samples);
    }

    #[test]
    fn test_invalid_parameters() {
        let params = ForestParams {
            min_samples_split: 1,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ForecastError::Configuration(_))
        ));
        let params = ForestParams {
            n_trees: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_train_and_predict() {
        let data = linear_data();
        let params = ForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let model = SmartcoreRandomForest::train(&data, &params).unwrap();
        assert_eq!(model.metadata.training_samples, 40);
        assert_eq!(model.n_features(), 2);

        // 2*3 + 3*2 = 12
        let value = model.predict(&[3.0, 2.0]).unwrap();
        assert!(value > 8.0 && value < 16.0, "prediction {}", value);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let data = linear_data();
        let params = ForestParams {
            n_trees: 10,
            ..Default::default()
        };
        let a = params.fit(&data).unwrap();
        let b = params.fit(&data).unwrap();
        let rows = vec![vec![1.5, 0.5], vec![6.0, 4.0]];
        assert_eq!(a.predict_batch(&rows).unwrap(), b.predict_batch(&rows).unwrap());
    }

    #[test]
    fn test_rejects_wrong_width() {
        let model = SmartcoreRandomForest::train(&linear_data(), &ForestParams::default()).unwrap();
        assert!(matches!(
            model.predict_batch(&[vec![1.0, 2.0, 3.0]]),
            Err(ForecastError::Model(_))
        ));
    }
}
