//! Historical target table

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::climate::CovariateTable;
use super::types::YearMonth;
use crate::error::{ForecastError, Result};

/// One numeric target column (a revenue/load category)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Monthly historical observations, one column per target category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalTable {
    dates: Vec<NaiveDate>,
    columns: Vec<TargetColumn>,
}

impl HistoricalTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<TargetColumn>) -> Result<Self> {
        if let Some(col) = columns.iter().find(|c| c.values.len() != dates.len()) {
            return Err(ForecastError::InsufficientData(format!(
                "column '{}' has {} values for {} dates",
                col.name,
                col.values.len(),
                dates.len()
            )));
        }

        if let Some((prev, next)) = dates
            .iter()
            .map(|d| YearMonth::from(*d))
            .tuple_windows()
            .find(|(prev, next)| !is_next_month(*prev, *next))
        {
            return Err(ForecastError::Configuration(format!(
                "historical dates must be consecutive months, found {} followed by {}",
                prev, next
            )));
        }

        Ok(Self { dates, columns })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[TargetColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    /// Check the positional alignment with the covariate table.
    ///
    /// The covariate table may extend past the history (it must cover the
    /// forecast horizon), but every historical row has to sit on the same
    /// calendar month as the covariate row with the same index.
    pub fn check_alignment(&self, covariates: &CovariateTable) -> Result<()> {
        if self.len() > covariates.len() {
            return Err(ForecastError::InsufficientData(format!(
                "historical table has {} rows but covariate table only {}",
                self.len(),
                covariates.len()
            )));
        }

        for (row, (date, cov)) in self.dates.iter().zip(covariates.rows()).enumerate() {
            if YearMonth::from(*date) != YearMonth::from(cov.date) {
                return Err(ForecastError::Misaligned {
                    row,
                    expected: *date,
                    covariates: cov.date,
                });
            }
        }

        Ok(())
    }
}

fn is_next_month(prev: YearMonth, next: YearMonth) -> bool {
    if prev.month == 12 {
        next.year == prev.year + 1 && next.month == 1
    } else {
        next.year == prev.year && next.month == prev.month + 1
    }
}
