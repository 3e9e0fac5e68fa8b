//! Feature engineering for the residual regressor
//!
//! A feature row is the covariate row of that period followed by one value
//! per selected autoregressive lag. The same assembly serves the training
//! matrix and every forecast block, so both always share column order.

use tracing::debug;

use super::lags::LagSet;
use crate::domain::{CovariateField, CovariateTable};
use crate::error::{ForecastError, Result};
use crate::ml::training::TrainingMatrix;
use crate::utils::stats::pearson;

/// Absolute correlation above which a covariate is reported as notable
pub const CORRELATION_HIGHLIGHT: f64 = 0.3;

/// Target preferred for the covariate correlation report
pub const CORRELATION_TARGET: &str = "Total";

/// Builds feature rows from covariates and a lagged series
#[derive(Debug, Clone, Copy)]
pub struct TrainingSetBuilder<'a> {
    covariates: &'a CovariateTable,
    lags: &'a LagSet,
}

impl<'a> TrainingSetBuilder<'a> {
    pub fn new(covariates: &'a CovariateTable, lags: &'a LagSet) -> Self {
        Self { covariates, lags }
    }

    /// Covariate names followed by `lag_<L>` per selected lag
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = CovariateField::names();
        names.extend(self.lags.names());
        names
    }

    pub fn n_features(&self) -> usize {
        CovariateField::count() + self.lags.len()
    }

    /// Training matrix over rows `0..=train_index`.
    ///
    /// `detrended` is the detrended target up to and including the cutoff.
    pub fn build(&self, detrended: &[f64], train_index: usize) -> Result<TrainingMatrix> {
        if detrended.len() != train_index + 1 {
            return Err(ForecastError::InsufficientData(format!(
                "detrended series has {} values, expected {}",
                detrended.len(),
                train_index + 1
            )));
        }

        let rows = self.feature_block(detrended, 0, train_index + 1)?;
        TrainingMatrix::new(self.feature_names(), rows, detrended.to_vec())
    }

    /// Feature rows for `start..end`, with lags read from `series[..end]`.
    ///
    /// Lag columns are recomputed over the whole prefix, so values written
    /// into `series` by earlier blocks are picked up as lag inputs.
    pub fn feature_block(&self, series: &[f64], start: usize, end: usize) -> Result<Vec<Vec<f64>>> {
        if end > series.len() {
            return Err(ForecastError::InsufficientData(format!(
                "lag rows up to {} requested, series has {} values",
                end,
                series.len()
            )));
        }

        let mut rows = self.covariates.feature_rows(start, end)?;
        let lag_columns = self.lags.columns(&series[..end]);
        for (offset, row) in rows.iter_mut().enumerate() {
            row.extend(lag_columns.iter().map(|column| column[start + offset]));
        }
        Ok(rows)
    }
}

/// Pearson correlation of `target` with every covariate over its rows
pub fn covariate_correlations(
    target: &[f64],
    covariates: &CovariateTable,
) -> Vec<(CovariateField, f64)> {
    use strum::IntoEnumIterator;

    let n = target.len().min(covariates.len());
    CovariateField::iter()
        .map(|field| {
            let values = covariates.column(field, 0, n);
            (field, pearson(&target[..n], &values))
        })
        .collect()
}

/// Column the correlation report runs against: `Total`, else the first one
pub fn correlation_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|c| c.as_str() == CORRELATION_TARGET)
        .or_else(|| columns.first())
        .map(String::as_str)
}

/// Log the covariate correlations of the training rows at debug level
pub fn log_covariate_correlations(column: &str, target: &[f64], covariates: &CovariateTable) {
    let correlations = covariate_correlations(target, covariates);
    let notable: Vec<String> = correlations
        .iter()
        .filter(|(_, r)| r.abs() > CORRELATION_HIGHLIGHT)
        .map(|(field, r)| format!("{}={:.3}", field, r))
        .collect();

    for (field, r) in &correlations {
        debug!(column, covariate = %field, correlation = r, "covariate correlation");
    }
    debug!(column, ?notable, "covariates with |r| > {}", CORRELATION_HIGHLIGHT);
}
