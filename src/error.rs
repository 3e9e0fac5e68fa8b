use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the forecasting pipeline and its file glue.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Train date '{0}' not found in covariate date column")]
    TrainDateNotFound(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Tables misaligned at row {row}: expected {expected}, covariates have {covariates}")]
    Misaligned {
        row: usize,
        expected: NaiveDate,
        covariates: NaiveDate,
    },

    #[error("Column '{0}' not found in historical table")]
    MissingColumn(String),

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Failed to parse date '{0}'")]
    DateParse(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error(
        "A forecast run is already in progress (lock file {0}); delete the file if no run is active"
    )]
    RunInProgress(PathBuf),

    #[error(transparent)]
    Metrics(#[from] crate::forecast::metrics::ForecastMetricsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    /// True for errors caused by run parameters rather than by the data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ForecastError::Configuration(_)
                | ForecastError::TrainDateNotFound(_)
                | ForecastError::DateParse(_)
                | ForecastError::MissingColumn(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
