use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{months_after, OUTPUT_DATE_FORMAT};
use crate::error::{ForecastError, Result};
use crate::forecast::metrics::ForecastMetrics;

/// Forecast (and, in evaluation mode, actuals) for one target column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnForecast {
    pub name: String,
    /// Recomposed forecast, `horizon` values
    pub predictions: Vec<f64>,
    /// Held-out actuals, or zero placeholders outside evaluation mode
    pub actuals: Vec<f64>,
    /// Selected autoregressive lags
    pub lags: Vec<usize>,
    /// Mean absolute percentage error, evaluation mode only
    pub mape: Option<f64>,
    /// Full accuracy metrics against the held-out actuals, evaluation mode only
    pub metrics: Option<ForecastMetrics>,
}

/// Wide table keyed by forecast date, one column per target category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    dates: Vec<NaiveDate>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ForecastTable {
    /// Empty table with `horizon` month-start dates following `cutoff`
    pub fn for_horizon(cutoff: NaiveDate, horizon: usize) -> Self {
        Self {
            dates: months_after(cutoff, horizon),
            columns: Vec::new(),
        }
    }

    /// Same dates, no columns
    pub fn with_dates_only(&self) -> Self {
        Self {
            dates: self.dates.clone(),
            columns: Vec::new(),
        }
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(ForecastError::InsufficientData(format!(
                "column '{}' has {} values for {} dates",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        self.columns.push((name, values));
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Header row: `TestDates` followed by the column names
    pub fn header(&self) -> Vec<String> {
        std::iter::once("TestDates".to_string())
            .chain(self.columns.iter().map(|(n, _)| n.clone()))
            .collect()
    }

    /// Data rows as strings, dates formatted `yyyy-mm-dd`
    pub fn records(&self) -> Vec<Vec<String>> {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                std::iter::once(date.format(OUTPUT_DATE_FORMAT).to_string())
                    .chain(self.columns.iter().map(|(_, v)| v[i].to_string()))
                    .collect()
            })
            .collect()
    }
}
