//! Trend extrapolation
//!
//! The training trend is smoothed by two cascaded exponentially weighted
//! means, re-decomposed with a robust STL, and the re-extracted trend is
//! extended with Holt's linear method.

use tracing::debug;

use super::decompose::Stl;
use super::holt::HoltLinearTrend;
use super::{EWM_SPANS, SEASONAL_PERIOD};
use crate::error::Result;

/// Exponentially weighted mean with `a = 2 / (span + 1)`, seeded with the
/// first value (no bias adjustment).
pub fn ewm(series: &[f64], span: usize) -> Vec<f64> {
    let a = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());
    let mut state = match series.first() {
        Some(&first) => first,
        None => return out,
    };
    out.push(state);
    for &x in &series[1..] {
        state = a * x + (1.0 - a) * state;
        out.push(state);
    }
    out
}

/// Extrapolates a training trend over the forecast horizon
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    spans: [usize; 2],
    stl: Stl,
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self {
            spans: EWM_SPANS,
            stl: Stl::new(SEASONAL_PERIOD).robust(),
        }
    }
}

impl TrendForecaster {
    /// `trend` smoothed by both EWM passes
    pub fn smooth(&self, trend: &[f64]) -> Vec<f64> {
        self.spans
            .iter()
            .fold(trend.to_vec(), |series, &span| ewm(&series, span))
    }

    /// Trend forecast of length `horizon`
    pub fn forecast(&self, trend: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let smoothed = self.smooth(trend);
        let decomposition = self.stl.decompose(&smoothed)?;
        let holt = HoltLinearTrend::fit(&decomposition.trend)?;

        debug!(
            alpha = holt.alpha(),
            beta = holt.beta(),
            level = holt.level(),
            slope = holt.slope(),
            "trend extrapolation fitted"
        );

        Ok(holt.forecast(horizon))
    }
}
