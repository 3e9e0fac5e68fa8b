//! Block-recursive residual forecasting
//!
//! The model predicts one block of months at a time. Growth-adjusted
//! predictions are written back into a [`ForecastBuffer`] so that later
//! blocks read them as autoregressive lag inputs.

use tracing::debug;

use super::features::TrainingSetBuilder;
use super::BLOCK_SIZE;
use crate::error::{ForecastError, Result};
use crate::ml::MLModel;

/// Detrended history followed by placeholders for every forecast block
#[derive(Debug, Clone)]
pub struct ForecastBuffer {
    values: Vec<f64>,
    history_len: usize,
    pointer: usize,
}

impl ForecastBuffer {
    /// Buffer of `history.len() + steps * BLOCK_SIZE` values
    pub fn new(history: &[f64], steps: usize) -> Self {
        let mut values = Vec::with_capacity(history.len() + steps * BLOCK_SIZE);
        values.extend_from_slice(history);
        values.resize(history.len() + steps * BLOCK_SIZE, 0.0);
        Self {
            values,
            history_len: history.len(),
            pointer: history.len(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the first unfilled placeholder
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Values written so far past the history
    pub fn forecasts(&self) -> &[f64] {
        &self.values[self.history_len..self.pointer]
    }

    /// Fill the next placeholders and advance the pointer
    pub fn write_block(&mut self, block: &[f64]) -> Result<()> {
        let end = self.pointer + block.len();
        if end > self.values.len() {
            return Err(ForecastError::InsufficientData(format!(
                "forecast buffer holds {} values, block would end at {}",
                self.values.len(),
                end
            )));
        }
        self.values[self.pointer..end].copy_from_slice(block);
        self.pointer = end;
        Ok(())
    }
}

/// Multiplier applied to every prediction of a block
pub fn growth_factor(growth_rate: f64) -> f64 {
    1.0 + (BLOCK_SIZE as f64 / 12.0) * growth_rate
}

/// Number of whole blocks that fit in `horizon` months
pub fn block_count(horizon: usize) -> usize {
    horizon / BLOCK_SIZE
}

/// Forecasts the detrended series block by block
#[derive(Debug, Clone, Copy)]
pub struct RecursiveForecaster {
    growth_rate: f64,
}

impl RecursiveForecaster {
    pub fn new(growth_rate: f64) -> Self {
        Self { growth_rate }
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Residual forecast of length `horizon`.
    ///
    /// Only `block_count(horizon)` whole blocks are predicted; any remaining
    /// tail positions stay zero. `buffer` must have room for every block.
    pub fn forecast(
        &self,
        model: &dyn MLModel,
        builder: &TrainingSetBuilder<'_>,
        buffer: &mut ForecastBuffer,
        horizon: usize,
    ) -> Result<Vec<f64>> {
        let steps = block_count(horizon);
        let needed = buffer.pointer() + steps * BLOCK_SIZE;
        if needed > buffer.len() {
            return Err(ForecastError::InsufficientData(format!(
                "forecast buffer holds {} values, {} blocks need {}",
                buffer.len(),
                steps,
                needed
            )));
        }

        let factor = growth_factor(self.growth_rate);
        let mut residual = vec![0.0; horizon];

        for step in 0..steps {
            let start = buffer.pointer();
            let end = start + BLOCK_SIZE;

            let features = builder.feature_block(buffer.values(), start, end)?;
            let predictions = model.predict_batch(&features)?;
            if predictions.len() != BLOCK_SIZE {
                return Err(ForecastError::Model(format!(
                    "model returned {} predictions for a block of {}",
                    predictions.len(),
                    BLOCK_SIZE
                )));
            }

            let adjusted: Vec<f64> = predictions.iter().map(|p| p * factor).collect();
            buffer.write_block(&adjusted)?;
            residual[step * BLOCK_SIZE..(step + 1) * BLOCK_SIZE].copy_from_slice(&adjusted);

            debug!(block = step, start, end, "residual block forecast");
        }

        Ok(residual)
    }
}
