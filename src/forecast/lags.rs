//! Autoregressive lag selection
//!
//! Lags are ranked by their partial autocorrelation on the detrended training
//! target. The ranking is ascending by raw PACF value, so the most negative
//! partial autocorrelations are picked first.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BLOCK_SIZE, MAX_PACF_LAG, SELECTED_LAG_COUNT};

/// Selected autoregressive lags, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagSet(Vec<usize>);

impl LagSet {
    pub fn new(lags: Vec<usize>) -> Self {
        Self(lags)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    /// Feature names of the lag columns
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|l| format!("lag_{}", l)).collect()
    }

    /// One column per lag over `series`: entry `r` is `series[r - lag]`, or
    /// zero while `r < lag`.
    pub fn columns(&self, series: &[f64]) -> Vec<Vec<f64>> {
        self.0
            .iter()
            .map(|&lag| lag_column(series, lag))
            .collect()
    }
}

/// Zero-padded lagged copy of `series`
pub fn lag_column(series: &[f64], lag: usize) -> Vec<f64> {
    let n = series.len();
    let mut column = vec![0.0; n];
    if lag < n {
        column[lag..].copy_from_slice(&series[..n - lag]);
    }
    column
}

/// Sample autocovariances for lags `0..=max_lag`, each divided by the number
/// of overlapping pairs.
fn adjusted_autocovariance(series: &[f64], max_lag: usize) -> Vec<f64> {
    let n = series.len();
    let mean = series.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = series.iter().map(|x| x - mean).collect();

    (0..=max_lag)
        .map(|k| {
            let sum: f64 = centered[k..]
                .iter()
                .zip(&centered[..n - k])
                .map(|(a, b)| a * b)
                .sum();
            sum / (n - k) as f64
        })
        .collect()
}

/// Partial autocorrelation for lags `0..=max_lag` (Yule-Walker estimates via
/// the Durbin-Levinson recursion). `pacf[0]` is 1.
///
/// A constant series yields NaN for every lag above zero.
pub fn partial_autocorrelation(series: &[f64], max_lag: usize) -> Vec<f64> {
    if series.is_empty() {
        return vec![f64::NAN; max_lag + 1];
    }
    let max_lag = max_lag.min(series.len() - 1);
    let acov = adjusted_autocovariance(series, max_lag);
    let rho: Vec<f64> = acov.iter().map(|c| c / acov[0]).collect();

    let mut pacf = vec![1.0; max_lag + 1];
    let mut phi: Vec<f64> = Vec::with_capacity(max_lag);

    for k in 1..=max_lag {
        let num = rho[k] - (1..k).map(|j| phi[j - 1] * rho[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * rho[j]).sum::<f64>();
        let phi_kk = num / den;

        let previous = phi.clone();
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - phi_kk * previous[k - j - 1];
        }
        phi.push(phi_kk);
        pacf[k] = phi_kk;
    }

    pacf
}

/// Picks the autoregressive lags fed to the regressor
#[derive(Debug, Clone, Copy)]
pub struct LagSelector {
    /// Largest lag whose PACF is computed
    pub max_lag: usize,
    /// Lags must be strictly greater than this (the forecast block size)
    pub min_lag_exclusive: usize,
    /// Number of lags kept
    pub count: usize,
}

impl Default for LagSelector {
    fn default() -> Self {
        Self {
            max_lag: MAX_PACF_LAG,
            min_lag_exclusive: BLOCK_SIZE,
            count: SELECTED_LAG_COUNT,
        }
    }
}

impl LagSelector {
    /// Largest lag computable on a series of length `n`
    pub fn usable_max_lag(&self, n: usize) -> usize {
        self.max_lag.min((n / 2).saturating_sub(1))
    }

    /// Rank lags by ascending PACF and keep the first `count` above the
    /// block size. May return fewer lags, or none.
    pub fn select(&self, detrended: &[f64]) -> LagSet {
        let max_lag = self.usable_max_lag(detrended.len());
        if max_lag < self.max_lag {
            warn!(
                requested = self.max_lag,
                usable = max_lag,
                series_len = detrended.len(),
                "PACF lag range clamped to half the series length"
            );
        }

        let pacf = partial_autocorrelation(detrended, max_lag);
        let lags = rank_ascending(&pacf)
            .into_iter()
            .filter(|&lag| lag > self.min_lag_exclusive)
            .take(self.count)
            .collect::<Vec<_>>();

        if lags.is_empty() {
            warn!(max_lag, "no admissible autoregressive lags; using covariates only");
        }
        debug!(?lags, "selected autoregressive lags");

        LagSet(lags)
    }
}

/// Lag indices ordered by ascending value; ties keep index order, NaN last
fn rank_ascending(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(values[i]));
    order
}
