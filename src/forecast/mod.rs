//! Forecasting pipeline stages, leaves first:
//! decomposition, lag selection, feature assembly, recursive residual
//! forecasting, trend extrapolation and recomposition.

pub mod decompose;
pub mod engine;
pub mod features;
pub mod holt;
pub mod lags;
pub mod metrics;
pub mod recursive;
pub mod trend;

pub use decompose::*;
pub use engine::*;
pub use features::*;
pub use holt::*;
pub use lags::*;
pub use metrics::*;
pub use recursive::*;
pub use trend::*;

/// Months predicted per recursive step
pub const BLOCK_SIZE: usize = 12;

/// Seasonal period of the monthly series
pub const SEASONAL_PERIOD: usize = 12;

/// Largest lag whose partial autocorrelation is computed
pub const MAX_PACF_LAG: usize = 48;

/// Number of autoregressive lags fed to the regressor
pub const SELECTED_LAG_COUNT: usize = 5;

/// Spans of the two cascaded EWM passes over the trend
pub const EWM_SPANS: [usize; 2] = [6, 12];
