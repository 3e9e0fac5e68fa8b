//! One forecasting run end to end: lock, load, forecast, persist.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::RunConfig;
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastEngine, ForecastMetrics, RunOutput};
use crate::repo::{self, RunRecord, StagedWrites};

pub const LOCK_FILE: &str = ".forecast.lock";

/// Exclusive claim on an output directory, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock file; fails if another run holds it
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ForecastError::RunInProgress(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}

/// Run parameters given on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub growth_rate: Option<f64>,
    pub horizon_months: Option<usize>,
    pub train_date: Option<String>,
    pub evaluate: bool,
    pub output_dir: Option<PathBuf>,
}

/// Outcome of one target column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub lags: Vec<usize>,
    pub mape: Option<f64>,
    /// MAE, RMSE, bias and MAPE in evaluation mode
    pub metrics: Option<ForecastMetrics>,
}

/// JSON report written next to the outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub parameters: RunConfig,
    pub train_index: usize,
    pub columns: Vec<ColumnSummary>,
    pub outputs: Vec<PathBuf>,
}

pub struct Runner {
    config: Config,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_dir(&self, overrides: &RunOverrides) -> PathBuf {
        overrides
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output.dir.clone())
    }

    /// CLI flag, then the stored run record, then the configured default
    pub fn resolve(&self, overrides: &RunOverrides, record: Option<RunRecord>) -> RunConfig {
        let defaults = &self.config.run;
        let growth_rate = overrides
            .growth_rate
            .or(record.map(|r| r.growth_rate))
            .unwrap_or(defaults.growth_rate);
        let horizon = overrides
            .horizon_months
            .or(record.map(|r| r.horizon_months))
            .unwrap_or(defaults.horizon_months);
        let train_date = overrides
            .train_date
            .clone()
            .unwrap_or_else(|| defaults.train_date.clone());

        RunConfig::new(growth_rate, horizon, train_date)
            .with_train_mode(overrides.evaluate || defaults.train_mode)
    }

    pub fn execute(&self, overrides: &RunOverrides) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let dir = self.output_dir(overrides);
        let _lock = RunLock::acquire(&dir)?;

        let record_path = dir.join(&self.config.output.run_record_file);
        let record = repo::run_record::load(&record_path)?;
        let parameters = self.resolve(overrides, record);
        parameters.validate()?;
        info!(%run_id, dir = %dir.display(), ?parameters, "forecast run requested");

        let data = &self.config.data;
        let history = repo::load_history(&data.historical_csv, &data.date_column, &data.target_columns)?;
        let covariates = repo::load_climate(&data.climate_csv)?;

        let engine = ForecastEngine::new(Box::new(self.config.model.clone()));
        let output = engine.run(&parameters, &history, &covariates, &data.target_columns)?;

        let files = &self.config.output;
        let mut writes = StagedWrites::new();
        let mut outputs = Vec::new();

        let forecast_path = dir.join(&files.forecast_file);
        writes.stage_table(&forecast_path, &output.forecast)?;
        outputs.push(forecast_path);

        if let Some(actuals) = &output.actuals {
            let path = dir.join(&files.actuals_file);
            writes.stage_table(&path, actuals)?;
            outputs.push(path);
        }
        if !self.config.categories.is_empty() {
            let categories = self.config.categories.aggregate(&output.forecast)?;
            let path = dir.join(&files.category_file);
            writes.stage_table(&path, &categories)?;
            outputs.push(path);
        }

        let record = RunRecord {
            growth_rate: parameters.growth_rate,
            horizon_months: parameters.horizon_months,
        };
        writes.stage_json(&record_path, &record)?;
        outputs.push(record_path);

        let report_path = dir.join(&files.report_file);
        outputs.push(report_path.clone());
        let report = build_report(run_id, started_at, parameters, &output, outputs);
        writes.stage_json(&report_path, &report)?;

        writes.commit()?;

        info!(%run_id, outputs = report.outputs.len(), "forecast run persisted");
        Ok(report)
    }
}

fn build_report(
    run_id: Uuid,
    started_at: DateTime<Utc>,
    parameters: RunConfig,
    output: &RunOutput,
    outputs: Vec<PathBuf>,
) -> RunReport {
    RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        parameters,
        train_index: output.plan.train_index,
        columns: output
            .columns
            .iter()
            .map(|c| ColumnSummary {
                name: c.name.clone(),
                lags: c.lags.clone(),
                mape: c.mape,
                metrics: c.metrics.clone(),
            })
            .collect(),
        outputs,
    }
}
