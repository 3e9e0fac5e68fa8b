//! Monthly load forecasting
//!
//! Each target column is decomposed into trend, seasonal and remainder
//! parts. The detrended series is forecast recursively in 12-month blocks
//! by a random forest over climate covariates and autoregressive lags; the
//! trend is smoothed and extrapolated with Holt's linear method; the two
//! are summed back together.

pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod ml;
pub mod repo;
pub mod runner;
pub mod telemetry;
pub mod utils;

pub use error::{ForecastError, Result};
pub use runner::{RunOverrides, RunReport, Runner};
