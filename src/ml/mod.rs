//! Machine Learning Module
//!
//! Regressors for the detrended residual series:
//! - Random forest regression (smartcore), the production model
//! - Fixed-coefficient linear model, a deterministic baseline
//!
//! # Architecture
//! - [`training::TrainingMatrix`] carries the assembled feature rows and targets
//! - [`models::ModelFactory`] fits a matrix into a boxed [`models::MLModel`]
//! - In-sample metrics are attached to every fitted model's metadata

use serde::{Deserialize, Serialize};

pub mod models;
pub mod smartcore;
pub mod training;

pub use models::{FixedLinear, LinearRegressionModel, MLModel, ModelFactory};
pub use self::smartcore::{ForestParams, SmartcoreRandomForest};
pub use training::{calculate_metrics, TrainingMatrix};

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    LinearRegression,
    RandomForest,
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: ModelType,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }
}
