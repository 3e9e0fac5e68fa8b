use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use super::decompose::Stl;
use super::features::{correlation_column, log_covariate_correlations, TrainingSetBuilder};
use super::lags::LagSelector;
use super::metrics::ForecastMetrics;
use super::recursive::{block_count, ForecastBuffer, RecursiveForecaster};
use super::trend::TrendForecaster;
use super::SEASONAL_PERIOD;
use crate::domain::{
    months_after, ColumnForecast, CovariateTable, ForecastTable, HistoricalTable, RunConfig,
    YearMonth,
};
use crate::error::{ForecastError, Result};
use crate::ml::{ForestParams, ModelFactory};

/// Row positions and parameters of a validated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Covariate row of the train cutoff
    pub train_index: usize,
    pub cutoff: NaiveDate,
    pub horizon: usize,
    pub growth_rate: f64,
    pub evaluate: bool,
}

impl RunPlan {
    /// Check every precondition of a run before any column is processed
    pub fn validate(
        config: &RunConfig,
        history: &HistoricalTable,
        covariates: &CovariateTable,
        columns: &[String],
    ) -> Result<Self> {
        config.validate()?;
        let cutoff = config.cutoff()?;
        let train_index = covariates.position_of(&config.train_date)?;
        let horizon = config.horizon_months;

        if covariates.len() < train_index + 1 + horizon {
            return Err(ForecastError::InsufficientData(format!(
                "covariates end at row {}, forecast needs rows up to {}",
                covariates.len(),
                train_index + horizon
            )));
        }

        history.check_alignment(covariates)?;
        check_forecast_rows(covariates, train_index, cutoff, horizon)?;

        if history.len() < train_index + 1 {
            return Err(ForecastError::InsufficientData(format!(
                "history has {} rows and does not reach the cutoff row {}",
                history.len(),
                train_index
            )));
        }
        if config.train_mode && history.len() < train_index + 1 + horizon {
            return Err(ForecastError::InsufficientData(format!(
                "evaluation needs {} actuals after the cutoff, history has {}",
                horizon,
                history.len() - train_index - 1
            )));
        }
        if train_index + 1 < 2 * SEASONAL_PERIOD {
            return Err(ForecastError::InsufficientData(format!(
                "training window has {} months, decomposition needs {}",
                train_index + 1,
                2 * SEASONAL_PERIOD
            )));
        }
        if columns.is_empty() {
            return Err(ForecastError::Configuration(
                "no target columns configured".to_string(),
            ));
        }
        for name in columns {
            history.column(name)?;
        }

        Ok(Self {
            train_index,
            cutoff,
            horizon,
            growth_rate: config.growth_rate,
            evaluate: config.train_mode,
        })
    }
}

/// Covariate rows after the cutoff must be the months being forecast
fn check_forecast_rows(
    covariates: &CovariateTable,
    train_index: usize,
    cutoff: NaiveDate,
    horizon: usize,
) -> Result<()> {
    for (offset, expected) in months_after(cutoff, horizon).into_iter().enumerate() {
        let row = train_index + 1 + offset;
        let found = covariates.row(row).map(|r| r.date).ok_or_else(|| {
            ForecastError::InsufficientData(format!("covariate row {} is missing", row))
        })?;
        if YearMonth::from(found) != YearMonth::from(expected) {
            return Err(ForecastError::Misaligned {
                row,
                expected,
                covariates: found,
            });
        }
    }
    Ok(())
}

/// Tables produced by a run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub plan: RunPlan,
    pub forecast: ForecastTable,
    /// Held-out actuals, evaluation mode only
    pub actuals: Option<ForecastTable>,
    pub columns: Vec<ColumnForecast>,
}

/// Per-column forecasting pipeline
pub struct ForecastEngine {
    factory: Box<dyn ModelFactory>,
    decomposer: Stl,
    lag_selector: LagSelector,
    trend: TrendForecaster,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(Box::new(ForestParams::default()))
    }
}

impl ForecastEngine {
    pub fn new(factory: Box<dyn ModelFactory>) -> Self {
        Self {
            factory,
            decomposer: Stl::new(SEASONAL_PERIOD),
            lag_selector: LagSelector::default(),
            trend: TrendForecaster::default(),
        }
    }

    /// Forecast every column in order; fails on the first error
    pub fn run(
        &self,
        config: &RunConfig,
        history: &HistoricalTable,
        covariates: &CovariateTable,
        columns: &[String],
    ) -> Result<RunOutput> {
        let plan = RunPlan::validate(config, history, covariates, columns)?;
        info!(
            train_index = plan.train_index,
            cutoff = %plan.cutoff,
            horizon = plan.horizon,
            growth_rate = plan.growth_rate,
            evaluate = plan.evaluate,
            columns = columns.len(),
            "starting forecast run"
        );

        if let Some(name) = correlation_column(columns) {
            let target = history.column(name)?;
            log_covariate_correlations(name, &target[..=plan.train_index], covariates);
        }

        let mut forecast = ForecastTable::for_horizon(plan.cutoff, plan.horizon);
        let mut actuals = plan.evaluate.then(|| forecast.with_dates_only());
        let mut results = Vec::with_capacity(columns.len());

        for name in columns {
            let target = history.column(name)?;
            let result = self.forecast_column(&plan, covariates, name, target)?;

            forecast.push_column(name.clone(), result.predictions.clone())?;
            if let Some(table) = actuals.as_mut() {
                table.push_column(name.clone(), result.actuals.clone())?;
            }
            results.push(result);
        }

        info!(columns = results.len(), "forecast run finished");

        Ok(RunOutput {
            plan,
            forecast,
            actuals,
            columns: results,
        })
    }

    /// Decompose, select lags, fit, forecast and recompose one target column
    pub fn forecast_column(
        &self,
        plan: &RunPlan,
        covariates: &CovariateTable,
        name: &str,
        target: &[f64],
    ) -> Result<ColumnForecast> {
        let _span = info_span!("column", name).entered();
        let training = target.get(..=plan.train_index).ok_or_else(|| {
            ForecastError::InsufficientData(format!(
                "column '{}' has {} values, cutoff row is {}",
                name,
                target.len(),
                plan.train_index
            ))
        })?;

        let decomposition = self.decomposer.decompose(training)?;
        let detrended = decomposition.detrended(training);

        let lags = self.lag_selector.select(&detrended);
        let builder = TrainingSetBuilder::new(covariates, &lags);
        let matrix = builder.build(&detrended, plan.train_index)?;
        let model = self.factory.fit(&matrix)?;

        let mut buffer = ForecastBuffer::new(&detrended, block_count(plan.horizon));
        let residual = RecursiveForecaster::new(plan.growth_rate).forecast(
            model.as_ref(),
            &builder,
            &mut buffer,
            plan.horizon,
        )?;
        let trend = self.trend.forecast(&decomposition.trend, plan.horizon)?;

        let predictions: Vec<f64> = residual.iter().zip(&trend).map(|(r, t)| r + t).collect();

        let (actuals, metrics) = if plan.evaluate {
            let held_out = target
                .get(plan.train_index + 1..=plan.train_index + plan.horizon)
                .ok_or_else(|| {
                    ForecastError::InsufficientData(format!(
                        "column '{}' lacks actuals for the {}-month horizon",
                        name, plan.horizon
                    ))
                })?
                .to_vec();
            let metrics = ForecastMetrics::calculate(&held_out, &predictions)?;
            (held_out, Some(metrics))
        } else {
            (vec![0.0; plan.horizon], None)
        };

        match &metrics {
            Some(m) => info!(lags = ?lags.as_slice(), metrics = %m, "column forecast complete"),
            None => info!(lags = ?lags.as_slice(), "column forecast complete"),
        }

        Ok(ColumnForecast {
            name: name.to_string(),
            predictions,
            actuals,
            lags: lags.as_slice().to_vec(),
            mape: metrics.as_ref().map(|m| m.mape),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::climate::tests::record;
    use crate::domain::TargetColumn;
    use crate::forecast::metrics::mape;
    use crate::ml::{FixedLinear, MLModel, TrainingMatrix};
    use chrono::Months;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
    }

    fn label(i: usize) -> String {
        (start() + Months::new(i as u32)).format("%d-%m-%Y").to_string()
    }

    fn tables(history_len: usize, covariate_len: usize) -> (HistoricalTable, CovariateTable) {
        let covariates = CovariateTable::prepare(
            (0..covariate_len)
                .map(|i| record(&label(i), (i % 9) as f64, (i % 12 + 1) as u32))
                .collect(),
        )
        .unwrap();
        let dates = (0..history_len)
            .map(|i| start() + Months::new(i as u32))
            .collect();
        let values = (0..history_len)
            .map(|i| 500.0 + 2.0 * i as f64 + 30.0 * ((i % 12) as f64 - 5.5).abs())
            .collect();
        let history = HistoricalTable::new(
            dates,
            vec![TargetColumn {
                name: "Total".to_string(),
                values,
            }],
        )
        .unwrap();
        (history, covariates)
    }

    /// Residual model predicting a constant, whatever the feature width
    struct ConstantResidual(f64);

    impl ModelFactory for ConstantResidual {
        fn fit(&self, data: &TrainingMatrix) -> Result<Box<dyn MLModel>> {
            FixedLinear {
                coefficients: vec![0.0; data.n_features()],
                intercept: self.0,
            }
            .fit(data)
        }
    }

    fn constant_engine(value: f64) -> ForecastEngine {
        ForecastEngine::new(Box::new(ConstantResidual(value)))
    }

    fn columns() -> Vec<String> {
        vec!["Total".to_string()]
    }

    #[test]
    fn test_plan_validation() {
        let (history, covariates) = tables(100, 120);
        let config = RunConfig::new(0.04, 12, label(90));
        let plan = RunPlan::validate(&config, &history, &covariates, &columns()).unwrap();
        assert_eq!(plan.train_index, 90);
        assert_eq!(plan.cutoff, start() + Months::new(90));
        assert!(!plan.evaluate);
    }

    #[test]
    fn test_plan_rejects_unknown_date() {
        let (history, covariates) = tables(100, 120);
        let config = RunConfig::new(0.04, 12, "15-03-2020");
        assert!(matches!(
            RunPlan::validate(&config, &history, &covariates, &columns()),
            Err(ForecastError::TrainDateNotFound(_))
        ));
    }

    #[test]
    fn test_plan_rejects_short_covariates() {
        let (history, covariates) = tables(100, 100);
        let config = RunConfig::new(0.04, 12, label(90));
        assert!(matches!(
            RunPlan::validate(&config, &history, &covariates, &columns()),
            Err(ForecastError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_plan_rejects_missing_actuals_and_columns() {
        let (history, covariates) = tables(95, 120);
        let config = RunConfig::new(0.04, 12, label(90)).with_train_mode(true);
        assert!(matches!(
            RunPlan::validate(&config, &history, &covariates, &columns()),
            Err(ForecastError::InsufficientData(_))
        ));

        let config = RunConfig::new(0.04, 12, label(90));
        assert!(matches!(
            RunPlan::validate(&config, &history, &covariates, &["L1".to_string()]),
            Err(ForecastError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_plan_rejects_short_training_window() {
        let (history, covariates) = tables(40, 60);
        let config = RunConfig::new(0.04, 12, label(20));
        assert!(matches!(
            RunPlan::validate(&config, &history, &covariates, &columns()),
            Err(ForecastError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_plan_rejects_gap_after_history() {
        let (history, _) = tables(101, 101);
        let records = (0..113)
            .map(|i| {
                // rows past the cutoff jump two years ahead
                let month = if i <= 100 { i } else { i + 24 };
                record(&label(month), (i % 9) as f64, (month % 12 + 1) as u32)
            })
            .collect();
        let covariates = CovariateTable::prepare(records).unwrap();
        let config = RunConfig::new(0.04, 12, label(100));

        match RunPlan::validate(&config, &history, &covariates, &columns()) {
            Err(ForecastError::Misaligned {
                row,
                expected,
                covariates,
            }) => {
                assert_eq!(row, 101);
                assert_eq!(expected, start() + Months::new(101));
                assert_eq!(covariates, start() + Months::new(125));
            }
            other => panic!("expected misalignment, got {:?}", other),
        }
    }

    #[test]
    fn test_run_shapes_and_recomposition() {
        let (history, covariates) = tables(120, 120);
        let config = RunConfig::new(0.04, 18, label(100)).with_train_mode(true);
        let output = constant_engine(0.0)
            .run(&config, &history, &covariates, &columns())
            .unwrap();

        assert_eq!(output.forecast.len(), 18);
        assert_eq!(output.forecast.dates()[0], start() + Months::new(101));
        let result = &output.columns[0];
        assert_eq!(result.predictions.len(), 18);
        assert!(result.predictions.iter().all(|v| v.is_finite()));

        // A zero residual model leaves only the trend forecast
        let trend = {
            let training = &history.column("Total").unwrap()[..=100];
            let decomposition = Stl::new(12).decompose(training).unwrap();
            TrendForecaster::default().forecast(&decomposition.trend, 18).unwrap()
        };
        assert_eq!(result.predictions, trend);

        let actuals = output.actuals.unwrap();
        assert_eq!(actuals.column("Total").unwrap(), &history.column("Total").unwrap()[101..119]);
        let expected = mape(&result.actuals, &result.predictions).unwrap();
        assert_eq!(result.mape, Some(expected));
        let metrics = result.metrics.as_ref().unwrap();
        assert_eq!(metrics.mape, expected);
        assert_eq!(metrics.sample_count, 18);
    }

    #[test]
    fn test_growth_applies_to_whole_blocks_only() {
        let (history, covariates) = tables(120, 120);
        let config = RunConfig::new(0.5, 18, label(100));
        let flat = constant_engine(0.0)
            .run(&config, &history, &covariates, &columns())
            .unwrap();
        let lifted = constant_engine(10.0)
            .run(&config, &history, &covariates, &columns())
            .unwrap();

        let a = &flat.columns[0].predictions;
        let b = &lifted.columns[0].predictions;
        for i in 0..12 {
            assert!((b[i] - a[i] - 15.0).abs() < 1e-9);
        }
        for i in 12..18 {
            assert_eq!(b[i], a[i]);
        }
        assert!(flat.actuals.is_none());
        assert!(flat.columns[0].actuals.iter().all(|v| *v == 0.0));
        assert_eq!(flat.columns[0].mape, None);
        assert!(flat.columns[0].metrics.is_none());
    }
}
