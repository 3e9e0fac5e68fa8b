//! Holt's linear trend model (double exponential smoothing).
//!
//! The model equations are:
//! - Level: `l_t = α × y_t + (1-α) × (l_{t-1} + b_{t-1})`
//! - Trend: `b_t = β × (l_t - l_{t-1}) + (1-β) × b_{t-1}`
//! - Forecast: `ŷ_{t+h} = l_t + h × b_t`
//!
//! The smoothing parameters and the initial level and slope are all fitted by
//! minimising the in-sample one-step-ahead squared error.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Holt model fitted to a series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltLinearTrend {
    alpha: f64,
    beta: f64,
    initial_level: f64,
    initial_slope: f64,
    /// Level after the last observation
    level: f64,
    /// Slope after the last observation
    slope: f64,
    sse: f64,
}

/// Filter state after running the recursions over `values`
struct Pass {
    level: f64,
    slope: f64,
    sse: f64,
}

fn run_filter(values: &[f64], alpha: f64, beta: f64, level0: f64, slope0: f64) -> Pass {
    let mut level = level0;
    let mut slope = slope0;
    let mut sse = 0.0;

    for &y in values {
        let error = y - (level + slope);
        sse += error * error;

        let previous = level;
        level = alpha * y + (1.0 - alpha) * (level + slope);
        slope = beta * (level - previous) + (1.0 - beta) * slope;
    }

    Pass { level, slope, sse }
}

impl HoltLinearTrend {
    /// Fit α, β ∈ [0, 1] and the initial state to `values`.
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(ForecastError::InsufficientData(format!(
                "Holt smoothing needs at least 2 values, got {}",
                values.len()
            )));
        }

        // Start with the initial state extrapolated one step before the data
        let slope0 = values[1] - values[0];
        let level0 = values[0] - slope0;

        let result = nelder_mead(
            |p| run_filter(values, p[0], p[1], p[2], p[3]).sse,
            &[0.5, 0.1, level0, slope0],
            &[
                (0.0, 1.0),
                (0.0, 1.0),
                (f64::NEG_INFINITY, f64::INFINITY),
                (f64::NEG_INFINITY, f64::INFINITY),
            ],
            NelderMeadConfig::default(),
        );

        let [alpha, beta, initial_level, initial_slope] = match result.optimal_point[..] {
            [a, b, l, s] => [a, b, l, s],
            _ => {
                return Err(ForecastError::Model(
                    "Holt optimisation returned a malformed point".to_string(),
                ))
            }
        };
        let pass = run_filter(values, alpha, beta, initial_level, initial_slope);

        Ok(Self {
            alpha,
            beta,
            initial_level,
            initial_slope,
            level: pass.level,
            slope: pass.slope,
            sse: pass.sse,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn initial_state(&self) -> (f64, f64) {
        (self.initial_level, self.initial_slope)
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// In-sample sum of squared one-step errors
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// `level + h × slope` for `h = 1..=horizon`
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|h| self.level + h as f64 * self.slope)
            .collect()
    }
}
