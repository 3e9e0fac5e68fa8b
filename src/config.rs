use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::CategoryMap;
use crate::ml::ForestParams;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub output: OutputConfig,
    pub run: RunDefaults,
    pub model: ForestParams,
    pub categories: CategoryMap,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub historical_csv: PathBuf,
    pub climate_csv: PathBuf,
    /// Date column of the historical table
    pub date_column: String,
    /// Target columns, forecast in this order
    pub target_columns: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        let mut target_columns: Vec<String> = (1..=11).map(|i| format!("L{}", i)).collect();
        target_columns.push("Total".to_string());
        target_columns.push("kWh".to_string());
        Self {
            historical_csv: PathBuf::from("data/historical.csv"),
            climate_csv: PathBuf::from("data/climate.csv"),
            date_column: "Date".to_string(),
            target_columns,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub forecast_file: String,
    pub actuals_file: String,
    pub category_file: String,
    pub run_record_file: String,
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            forecast_file: "New_Load_Forecast.csv".to_string(),
            actuals_file: "new_actuals.csv".to_string(),
            category_file: "category_forecast.csv".to_string(),
            run_record_file: "run_config.json".to_string(),
            report_file: "run_report.json".to_string(),
        }
    }
}

/// Run parameters used when neither the CLI nor the run record sets them
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunDefaults {
    pub growth_rate: f64,
    pub horizon_months: usize,
    pub train_date: String,
    pub train_mode: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            growth_rate: 0.04,
            horizon_months: 60,
            train_date: "01-03-2025".to_string(),
            train_mode: false,
        }
    }
}

impl Config {
    /// TOML file (optional) overlaid with `LF__SECTION__KEY` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LF__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.data.target_columns.len(), 13);
        assert_eq!(cfg.data.target_columns[12], "kWh");
        assert_eq!(cfg.run.growth_rate, 0.04);
        assert_eq!(cfg.run.horizon_months, 60);
        assert_eq!(cfg.model.n_trees, 100);
        assert_eq!(cfg.output.forecast_file, "New_Load_Forecast.csv");
    }

    #[test]
    fn test_load_toml_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[data]
target_columns = ["Total"]

[run]
horizon_months = 24

[model]
n_trees = 10

[categories]
everything = ["Total"]
"#
        )
        .unwrap();

        let cfg = Config::load_from(file.path()).unwrap();
        assert_eq!(cfg.data.target_columns, vec!["Total"]);
        assert_eq!(cfg.data.date_column, "Date");
        assert_eq!(cfg.run.horizon_months, 24);
        assert_eq!(cfg.run.growth_rate, 0.04);
        assert_eq!(cfg.model.n_trees, 10);
        assert_eq!(cfg.model.seed, 42);
        assert_eq!(cfg.categories.0.len(), 1);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.output.dir, PathBuf::from("outputs"));
        assert!(!cfg.categories.is_empty());
    }
}
