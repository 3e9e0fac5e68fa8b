//! End-to-end runs over synthetic CSV inputs

use std::fs;
use std::path::Path;

use chrono::{Months, NaiveDate};
use load_forecaster::config::Config;
use load_forecaster::forecast::mape;
use load_forecaster::runner::LOCK_FILE;
use load_forecaster::{ForecastError, RunOverrides, Runner};
use tempfile::TempDir;

const MONTHS: usize = 120;
const CUTOFF: usize = 100;

fn month(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Months::new(i as u32)
}

fn label(i: usize) -> String {
    month(i).format("%d-%m-%Y").to_string()
}

fn rainfall(i: usize) -> f64 {
    40.0 + 35.0 * ((i % 12) as f64 * std::f64::consts::PI / 6.0).sin() + (i * 7 % 11) as f64
}

fn temperature(i: usize) -> f64 {
    28.0 + 5.0 * ((i % 12) as f64 * std::f64::consts::PI / 6.0).cos()
}

fn load(i: usize, base: f64) -> f64 {
    base + 3.0 * i as f64 + 0.8 * temperature(i) * 10.0 + (i * 13 % 17) as f64
}

fn write_inputs(dir: &Path) {
    let mut history = String::from("Date,L1,Total\n");
    for i in 0..MONTHS {
        history.push_str(&format!("{},{:.3},{:.3}\n", label(i), load(i, 200.0), load(i, 900.0)));
    }
    fs::write(dir.join("historical.csv"), history).unwrap();

    let mut climate =
        String::from("DateTime,Tmax_C,Rain_mm,Rain_Lag1,Rain_Lag2,Sun_hrs,PCI,Month_num\n");
    for i in 0..MONTHS {
        let lag = |k: usize| if i >= k { rainfall(i - k) } else { 0.0 };
        climate.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},{:.1},{:.1},{}\n",
            label(i),
            temperature(i),
            rainfall(i),
            lag(1),
            lag(2),
            7.0 + (i % 5) as f64,
            100.0 + 0.5 * i as f64,
            i % 12 + 1
        ));
    }
    fs::write(dir.join("climate.csv"), climate).unwrap();
}

fn config(dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.data.historical_csv = dir.join("historical.csv");
    cfg.data.climate_csv = dir.join("climate.csv");
    cfg.data.target_columns = vec!["L1".to_string(), "Total".to_string()];
    cfg.output.dir = dir.join("out");
    cfg.model.n_trees = 10;
    cfg
}

fn overrides(evaluate: bool) -> RunOverrides {
    RunOverrides {
        growth_rate: Some(0.04),
        horizon_months: Some(12),
        train_date: Some(label(CUTOFF)),
        evaluate,
        output_dir: None,
    }
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn setup() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let cfg = config(dir.path());
    (dir, cfg)
}

#[test]
fn test_forecast_run_writes_outputs() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let report = Runner::new(cfg).execute(&overrides(false)).unwrap();

    assert_eq!(report.train_index, CUTOFF);
    assert_eq!(report.columns.len(), 2);
    assert!(report.columns.iter().all(|c| c.mape.is_none() && c.metrics.is_none()));
    assert!(report.columns.iter().all(|c| c.lags.len() <= 5));

    let rows = read_csv(&out.join("New_Load_Forecast.csv"));
    assert_eq!(rows.len(), 12);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row[0], month(CUTOFF + 1 + i).format("%Y-%m-%d").to_string());
        for value in &row[1..] {
            assert!(value.parse::<f64>().unwrap().is_finite());
        }
    }

    assert!(!out.join("new_actuals.csv").exists());
    assert!(out.join("category_forecast.csv").exists());
    assert!(out.join("run_report.json").exists());
    assert!(!out.join(LOCK_FILE).exists());

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("run_config.json")).unwrap()).unwrap();
    assert_eq!(record["growth_rate"], 0.04);
    assert_eq!(record["horizon_months"], 12);
}

#[test]
fn test_repeated_runs_are_identical() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let runner = Runner::new(cfg);

    runner.execute(&overrides(false)).unwrap();
    let first = fs::read_to_string(out.join("New_Load_Forecast.csv")).unwrap();
    runner.execute(&overrides(false)).unwrap();
    let second = fs::read_to_string(out.join("New_Load_Forecast.csv")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_evaluation_mape_matches_naive_recomputation() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let report = Runner::new(cfg).execute(&overrides(true)).unwrap();

    let forecast = read_csv(&out.join("New_Load_Forecast.csv"));
    let actuals = read_csv(&out.join("new_actuals.csv"));
    assert_eq!(actuals.len(), 12);

    for (col, summary) in report.columns.iter().enumerate() {
        let predicted: Vec<f64> = forecast.iter().map(|r| r[col + 1].parse().unwrap()).collect();
        let actual: Vec<f64> = actuals.iter().map(|r| r[col + 1].parse().unwrap()).collect();
        for (i, a) in actual.iter().enumerate() {
            let base = if summary.name == "L1" { 200.0 } else { 900.0 };
            assert!((a - load(CUTOFF + 1 + i, base)).abs() < 1e-3);
        }

        let naive = actual
            .iter()
            .zip(&predicted)
            .map(|(a, p)| 100.0 * (a - p).abs() / a)
            .sum::<f64>()
            / actual.len() as f64;
        let reported = summary.mape.unwrap();
        let metrics = summary.metrics.as_ref().unwrap();
        assert_eq!(metrics.mape, reported);
        assert_eq!(metrics.sample_count, 12);
        // CSV values are printed with shortest round-trip precision
        assert!((reported - naive).abs() < 1e-9);
        assert!((reported - mape(&actual, &predicted).unwrap()).abs() < 1e-9);
    }
}

#[test]
fn test_unknown_train_date_writes_nothing() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let overrides = RunOverrides {
        train_date: Some("15-06-2023".to_string()),
        ..overrides(false)
    };

    let err = Runner::new(cfg).execute(&overrides).unwrap_err();
    assert!(matches!(err, ForecastError::TrainDateNotFound(_)));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_failed_run_keeps_previous_outputs() {
    let (dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let runner = Runner::new(cfg);
    runner.execute(&overrides(false)).unwrap();
    let before = fs::read_to_string(out.join("New_Load_Forecast.csv")).unwrap();

    fs::write(dir.path().join("historical.csv"), "Date,L1\n01-01-2015,1\n").unwrap();
    assert!(runner.execute(&overrides(false)).is_err());

    let after = fs::read_to_string(out.join("New_Load_Forecast.csv")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_concurrent_run_is_rejected() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join(LOCK_FILE), "1234\n").unwrap();

    let err = Runner::new(cfg).execute(&overrides(false)).unwrap_err();
    assert!(matches!(err, ForecastError::RunInProgress(_)));
    assert!(!out.join("New_Load_Forecast.csv").exists());
}

#[test]
fn test_stored_parameters_reused() {
    let (_dir, cfg) = setup();
    let out = cfg.output.dir.clone();
    let runner = Runner::new(cfg);
    runner
        .execute(&RunOverrides {
            horizon_months: Some(6),
            ..overrides(false)
        })
        .unwrap();

    let report = runner
        .execute(&RunOverrides {
            horizon_months: None,
            growth_rate: None,
            ..overrides(false)
        })
        .unwrap();
    assert_eq!(report.parameters.horizon_months, 6);
    assert_eq!(report.parameters.growth_rate, 0.04);
    assert_eq!(read_csv(&out.join("New_Load_Forecast.csv")).len(), 6);
}
