use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::parse_label_date;
use crate::error::{ForecastError, Result};

/// Largest accepted forecast horizon, in months
pub const MAX_HORIZON_MONTHS: usize = 120;

/// Parameters of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Annual growth rate applied per forecast block (fraction)
    pub growth_rate: f64,
    /// Months to forecast past the cutoff
    pub horizon_months: usize,
    /// Evaluate against actuals after the cutoff
    pub train_mode: bool,
    /// Cutoff label, `dd-mm-yyyy`, matched exactly against the covariate dates
    pub train_date: String,
}

impl RunConfig {
    pub fn new(growth_rate: f64, horizon_months: usize, train_date: impl Into<String>) -> Self {
        Self {
            growth_rate,
            horizon_months,
            train_mode: false,
            train_date: train_date.into(),
        }
    }

    pub fn with_train_mode(mut self, train_mode: bool) -> Self {
        self.train_mode = train_mode;
        self
    }

    /// Validate bounds and the cutoff format
    pub fn validate(&self) -> Result<()> {
        if !(self.growth_rate > 0.0 && self.growth_rate <= 1.0) {
            return Err(ForecastError::Configuration(format!(
                "growth rate must be in (0, 1], got {}",
                self.growth_rate
            )));
        }

        if self.horizon_months == 0 || self.horizon_months > MAX_HORIZON_MONTHS {
            return Err(ForecastError::Configuration(format!(
                "horizon must be in (0, {}] months, got {}",
                MAX_HORIZON_MONTHS, self.horizon_months
            )));
        }

        self.cutoff().map(|_| ())
    }

    /// Parsed cutoff date
    pub fn cutoff(&self) -> Result<NaiveDate> {
        parse_label_date(&self.train_date)
    }
}
