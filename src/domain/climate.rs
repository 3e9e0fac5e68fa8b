//! Climate covariates for the regression model
//!
//! Raw climate rows are turned into a [`CovariateTable`] once per run. The
//! table is aligned with the historical targets purely by row position, so it
//! is never re-ordered or filtered after preparation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use super::types::parse_table_date;
use crate::error::{ForecastError, Result};
use crate::utils::stats::mean;

/// One row of the climate input table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClimateRecord {
    /// Period label, `dd-mm-yyyy`
    #[serde(rename = "DateTime")]
    pub date_label: String,
    #[serde(rename = "Tmax_C")]
    pub max_temp_c: f64,
    #[serde(rename = "Rain_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Rain_Lag1")]
    pub rain_lag1_mm: f64,
    #[serde(rename = "Rain_Lag2")]
    pub rain_lag2_mm: f64,
    #[serde(rename = "Sun_hrs")]
    pub sunshine_hours: f64,
    /// Price/consumption index
    #[serde(rename = "PCI")]
    pub price_index: f64,
    #[serde(rename = "Month_num")]
    pub month_num: u32,
}

/// Regressor inputs, in the column order the model is trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum CovariateField {
    #[strum(serialize = "Tmax_C")]
    MaxTemperature,
    #[strum(serialize = "Rain_mm")]
    Rainfall,
    #[strum(serialize = "Rain_Lag1")]
    RainLag1,
    #[strum(serialize = "Rain_Lag2")]
    RainLag2,
    #[strum(serialize = "Sun_hrs")]
    Sunshine,
    #[strum(serialize = "PCI")]
    PriceIndex,
    #[strum(serialize = "rFlag")]
    RainFlag,
    #[strum(serialize = "Month_num")]
    MonthNumber,
}

impl CovariateField {
    /// Column names of the covariate block of a feature row
    pub fn names() -> Vec<String> {
        Self::iter().map(|f| f.to_string()).collect()
    }

    pub fn count() -> usize {
        Self::iter().count()
    }
}

/// Prepared covariates for one period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovariateRow {
    pub date_label: String,
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub rainfall_mm: f64,
    pub rain_lag1_mm: f64,
    pub rain_lag2_mm: f64,
    pub sunshine_hours: f64,
    pub price_index: f64,
    /// Rain lag 1 above the table-wide mean
    pub rain_flag: bool,
    /// Kept for analysis; not a regressor input
    pub rain_lag1_sq: f64,
    pub month_num: u32,
}

impl CovariateRow {
    pub fn value(&self, field: CovariateField) -> f64 {
        match field {
            CovariateField::MaxTemperature => self.max_temp_c,
            CovariateField::Rainfall => self.rainfall_mm,
            CovariateField::RainLag1 => self.rain_lag1_mm,
            CovariateField::RainLag2 => self.rain_lag2_mm,
            CovariateField::Sunshine => self.sunshine_hours,
            CovariateField::PriceIndex => self.price_index,
            CovariateField::RainFlag => {
                if self.rain_flag {
                    1.0
                } else {
                    0.0
                }
            }
            CovariateField::MonthNumber => self.month_num as f64,
        }
    }

    /// Regressor inputs for this row
    pub fn features(&self) -> Vec<f64> {
        CovariateField::iter().map(|f| self.value(f)).collect()
    }
}

/// Covariate table aligned row-for-row with the target series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovariateTable {
    rows: Vec<CovariateRow>,
    /// Threshold used for the rain flag
    pub rain_lag1_mean: f64,
}

impl CovariateTable {
    /// Derive the rain flag and squared rain-lag term from raw climate rows.
    ///
    /// The flag threshold is the mean of `Rain_Lag1` over every row, including
    /// the future rows beyond the train cutoff.
    pub fn prepare(records: Vec<ClimateRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::InsufficientData(
                "climate table has no rows".to_string(),
            ));
        }

        let rain_lag1: Vec<f64> = records.iter().map(|r| r.rain_lag1_mm).collect();
        let rain_lag1_mean = mean(&rain_lag1);

        let rows = records
            .into_iter()
            .map(|r| {
                let date = parse_table_date(&r.date_label)?;
                Ok(CovariateRow {
                    date,
                    max_temp_c: r.max_temp_c,
                    rainfall_mm: r.rainfall_mm,
                    rain_lag1_mm: r.rain_lag1_mm,
                    rain_lag2_mm: r.rain_lag2_mm,
                    sunshine_hours: r.sunshine_hours,
                    price_index: r.price_index,
                    rain_flag: r.rain_lag1_mm > rain_lag1_mean,
                    rain_lag1_sq: r.rain_lag1_mm * r.rain_lag1_mm,
                    month_num: r.month_num,
                    date_label: r.date_label,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows,
            rain_lag1_mean,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CovariateRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&CovariateRow> {
        self.rows.get(index)
    }

    /// Row index of the train cutoff. The label must match exactly.
    pub fn position_of(&self, label: &str) -> Result<usize> {
        self.rows
            .iter()
            .position(|r| r.date_label == label)
            .ok_or_else(|| ForecastError::TrainDateNotFound(label.to_string()))
    }

    /// Covariate feature rows for `start..end`
    pub fn feature_rows(&self, start: usize, end: usize) -> Result<Vec<Vec<f64>>> {
        if end > self.rows.len() || start > end {
            return Err(ForecastError::InsufficientData(format!(
                "covariate rows {}..{} requested, table has {} rows",
                start,
                end,
                self.rows.len()
            )));
        }
        Ok(self.rows[start..end].iter().map(CovariateRow::features).collect())
    }

    /// Values of one covariate over `start..end`
    pub fn column(&self, field: CovariateField, start: usize, end: usize) -> Vec<f64> {
        self.rows[start.min(self.rows.len())..end.min(self.rows.len())]
            .iter()
            .map(|r| r.value(field))
            .collect()
    }
}
