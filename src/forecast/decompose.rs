//! Seasonal-trend decomposition (STL)
//!
//! LOESS based decomposition into trend, seasonal and remainder components
//! (Cleveland et al., 1990). All smoothers use local linear fits and are
//! evaluated at every point, so the result is fully deterministic.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::utils::stats::median;

/// Components of a decomposed series, each as long as the input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<f64>,
}

impl Decomposition {
    /// Series minus its trend
    pub fn detrended(&self, series: &[f64]) -> Vec<f64> {
        series
            .iter()
            .zip(&self.trend)
            .map(|(y, t)| y - t)
            .collect()
    }
}

/// STL decomposer
#[derive(Debug, Clone)]
pub struct Stl {
    period: usize,
    seasonal_span: usize,
    trend_span: usize,
    low_pass_span: usize,
    inner_iterations: usize,
    outer_iterations: usize,
}

impl Stl {
    /// Non-robust decomposer with the default smoother spans for `period`
    pub fn new(period: usize) -> Self {
        let seasonal_span = 7;
        let trend_span =
            (1.5 * period as f64 / (1.0 - 1.5 / seasonal_span as f64)).ceil() as usize;
        Self {
            period,
            seasonal_span,
            trend_span: make_odd(trend_span),
            low_pass_span: make_odd(period + 1),
            inner_iterations: 5,
            outer_iterations: 0,
        }
    }

    /// Down-weight outliers with bisquare robustness passes
    pub fn robust(mut self) -> Self {
        self.inner_iterations = 2;
        self.outer_iterations = 15;
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn is_robust(&self) -> bool {
        self.outer_iterations > 0
    }

    pub fn decompose(&self, series: &[f64]) -> Result<Decomposition> {
        if self.period < 2 {
            return Err(ForecastError::Configuration(format!(
                "seasonal period must be at least 2, got {}",
                self.period
            )));
        }
        let n = series.len();
        if n < 2 * self.period {
            return Err(ForecastError::InsufficientData(format!(
                "decomposition needs two full periods ({} values), got {}",
                2 * self.period,
                n
            )));
        }

        let mut weights = vec![1.0; n];
        let mut trend = vec![0.0; n];
        let mut seasonal = vec![0.0; n];

        for pass in 0..=self.outer_iterations {
            for _ in 0..self.inner_iterations {
                let detrended: Vec<f64> =
                    series.iter().zip(&trend).map(|(y, t)| y - t).collect();

                let cycle = self.smooth_cycle_subseries(&detrended, &weights);
                let low_pass = self.low_pass(&cycle);
                for i in 0..n {
                    seasonal[i] = cycle[self.period + i] - low_pass[i];
                }

                let deseasonalized: Vec<f64> =
                    series.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
                trend = loess(&deseasonalized, self.trend_span, &weights);
            }

            if pass < self.outer_iterations {
                weights = robustness_weights(series, &seasonal, &trend);
            }
        }

        let remainder = series
            .iter()
            .zip(&seasonal)
            .zip(&trend)
            .map(|((y, s), t)| y - s - t)
            .collect();

        Ok(Decomposition {
            trend,
            seasonal,
            remainder,
        })
    }

    /// Smooth each cycle-subseries, extended by one period on both ends.
    ///
    /// Returns `n + 2 * period` values.
    fn smooth_cycle_subseries(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let n = detrended.len();
        let period = self.period;
        let mut cycle = vec![0.0; n + 2 * period];

        for phase in 0..period {
            let values: Vec<f64> = detrended.iter().skip(phase).step_by(period).copied().collect();
            let sub_weights: Vec<f64> = weights.iter().skip(phase).step_by(period).copied().collect();
            let k = values.len();
            if k == 0 {
                continue;
            }

            let smoothed = loess(&values, self.seasonal_span, &sub_weights);

            let right = self.seasonal_span.min(k) - 1;
            let before = local_fit(&values, self.seasonal_span, -1.0, 0, right, &sub_weights)
                .unwrap_or(smoothed[0]);

            let left = k.saturating_sub(self.seasonal_span);
            let after = local_fit(&values, self.seasonal_span, k as f64, left, k - 1, &sub_weights)
                .unwrap_or(smoothed[k - 1]);

            cycle[phase] = before;
            for (m, v) in smoothed.iter().enumerate() {
                cycle[(m + 1) * period + phase] = *v;
            }
            cycle[(k + 1) * period + phase] = after;
        }

        cycle
    }

    /// Moving averages of length period, period and 3, then a LOESS pass.
    fn low_pass(&self, cycle: &[f64]) -> Vec<f64> {
        let smoothed = moving_average(&moving_average(&moving_average(cycle, self.period), self.period), 3);
        let ones = vec![1.0; smoothed.len()];
        loess(&smoothed, self.low_pass_span, &ones)
    }
}

impl Default for Stl {
    fn default() -> Self {
        Self::new(12)
    }
}

fn make_odd(span: usize) -> usize {
    if span % 2 == 0 {
        span + 1
    } else {
        span
    }
}

fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// LOESS smoother evaluated at every position of `values`.
///
/// Positions whose neighbourhood carries no weight keep their input value.
fn loess(values: &[f64], span: usize, weights: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }

    if span >= n {
        return (0..n)
            .map(|i| local_fit(values, span, i as f64, 0, n - 1, weights).unwrap_or(values[i]))
            .collect();
    }

    let half = (span + 1) / 2;
    (0..n)
        .map(|i| {
            let (left, right) = if i + 1 < half {
                (0, span - 1)
            } else if i + half >= n {
                (n - span, n - 1)
            } else {
                (i + 1 - half, span + i - half)
            };
            local_fit(values, span, i as f64, left, right, weights).unwrap_or(values[i])
        })
        .collect()
}

/// Weighted local linear fit over `left..=right`, evaluated at `x`.
fn local_fit(
    values: &[f64],
    span: usize,
    x: f64,
    left: usize,
    right: usize,
    weights: &[f64],
) -> Option<f64> {
    let n = values.len();
    let mut h = (x - left as f64).max(right as f64 - x);
    if span > n {
        h += ((span - n) / 2) as f64;
    }
    let h_upper = 0.999 * h;
    let h_lower = 0.001 * h;

    let mut w: Vec<f64> = (left..=right)
        .map(|j| {
            let r = (j as f64 - x).abs();
            if r > h_upper {
                0.0
            } else if r <= h_lower {
                weights[j]
            } else {
                (1.0 - (r / h).powi(3)).powi(3) * weights[j]
            }
        })
        .collect();

    let total: f64 = w.iter().sum();
    if total <= 0.0 {
        return None;
    }
    w.iter_mut().for_each(|wi| *wi /= total);

    if h > 0.0 {
        let center: f64 = w.iter().zip(left..=right).map(|(wi, j)| wi * j as f64).sum();
        let spread: f64 = w
            .iter()
            .zip(left..=right)
            .map(|(wi, j)| wi * (j as f64 - center).powi(2))
            .sum();
        if spread.sqrt() > 0.001 * (n - 1) as f64 {
            let slope = (x - center) / spread;
            for (wi, j) in w.iter_mut().zip(left..=right) {
                *wi *= slope * (j as f64 - center) + 1.0;
            }
        }
    }

    Some(w.iter().zip(&values[left..=right]).map(|(wi, v)| wi * v).sum())
}

/// Bisquare weights from the absolute remainder, scaled by 6 MADs.
fn robustness_weights(series: &[f64], seasonal: &[f64], trend: &[f64]) -> Vec<f64> {
    let residuals: Vec<f64> = series
        .iter()
        .zip(seasonal)
        .zip(trend)
        .map(|((y, s), t)| (y - s - t).abs())
        .collect();
    let scale = 6.0 * median(&residuals);
    let upper = 0.999 * scale;
    let lower = 0.001 * scale;

    residuals
        .iter()
        .map(|&r| {
            if r <= lower {
                1.0
            } else if r <= upper {
                (1.0 - (r / scale).powi(2)).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}
