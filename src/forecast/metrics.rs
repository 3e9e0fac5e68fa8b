//! Forecast Metrics and Evaluation
//!
//! Accuracy of a recomposed forecast against held-out actuals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean absolute percentage error, `mean(100 × |actual − predicted| / actual)`.
///
/// No filtering: a zero actual yields an infinite or NaN result.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64, ForecastMetricsError> {
    check_dimensions(actual, predicted)?;
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| 100.0 * (a - p).abs() / a)
        .sum();
    Ok(total / actual.len() as f64)
}

fn check_dimensions(actual: &[f64], predicted: &[f64]) -> Result<(), ForecastMetricsError> {
    if actual.len() != predicted.len() {
        return Err(ForecastMetricsError::DimensionMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastMetricsError::EmptyData);
    }
    Ok(())
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (%)
    pub mape: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
    /// Largest absolute error
    pub max_error: f64,
    /// Mean signed error, actual minus predicted
    pub bias: f64,
}

impl ForecastMetrics {
    /// Calculate metrics from actual and predicted values
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, ForecastMetricsError> {
        let mape = mape(actual, predicted)?;
        let n = actual.len() as f64;

        let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
        let max_error = errors.iter().map(|e| e.abs()).fold(0.0f64, f64::max);
        let bias = errors.iter().sum::<f64>() / n;

        Ok(ForecastMetrics {
            mae,
            rmse,
            mape,
            sample_count: actual.len(),
            max_error,
            bias,
        })
    }

    /// Assess forecast quality based on MAPE
    pub fn quality(&self) -> ForecastQuality {
        if self.mape < 5.0 {
            ForecastQuality::Excellent
        } else if self.mape < 10.0 {
            ForecastQuality::Good
        } else if self.mape < 20.0 {
            ForecastQuality::Fair
        } else if self.mape < 50.0 {
            ForecastQuality::Poor
        } else {
            ForecastQuality::VeryPoor
        }
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE={:.3}, RMSE={:.3}, MAPE={:.2}%, Quality={:?}",
            self.mae,
            self.rmse,
            self.mape,
            self.quality()
        )
    }
}

/// Forecast quality classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastQuality {
    Excellent, // MAPE < 5%
    Good,      // MAPE 5-10%
    Fair,      // MAPE 10-20%
    Poor,      // MAPE 20-50%
    VeryPoor,  // MAPE >= 50% or undefined
}

/// Forecast metrics calculation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ForecastMetricsError {
    #[error("Dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("Empty data provided")]
    EmptyData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_forecast() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let metrics = ForecastMetrics::calculate(&actual, &actual).unwrap();

        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mape, 0.0);
        assert_eq!(metrics.quality(), ForecastQuality::Excellent);
    }

    #[test]
    fn test_mape_matches_naive_formula() {
        let actual = vec![100.0, 200.0, 400.0];
        let predicted = vec![110.0, 180.0, 400.0];
        // (10% + 10% + 0%) / 3
        let value = mape(&actual, &predicted).unwrap();
        assert!((value - 20.0 / 3.0).abs() < 1e-12);

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();
        assert_eq!(metrics.mape, value);
        assert_eq!(metrics.max_error, 20.0);
        assert!((metrics.bias - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.quality(), ForecastQuality::Good);
    }

    #[test]
    fn test_zero_actual_not_filtered() {
        let value = mape(&[0.0, 10.0], &[1.0, 10.0]).unwrap();
        assert!(value.is_infinite());
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(matches!(
            mape(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(ForecastMetricsError::DimensionMismatch { actual: 3, predicted: 2 })
        ));
        assert!(matches!(mape(&[], &[]), Err(ForecastMetricsError::EmptyData)));
    }
}
