use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use load_forecaster::config::{Config, DEFAULT_CONFIG_PATH};
use load_forecaster::telemetry::init_tracing;
use load_forecaster::{ForecastError, RunOverrides, Runner};
use tracing::info;

/// Forecast monthly load per target column
#[derive(Parser, Debug)]
#[command(name = "load-forecaster", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Annual growth rate applied to each forecast block
    #[arg(short, long)]
    growth_rate: Option<f64>,

    /// Months to forecast after the cutoff
    #[arg(long)]
    horizon: Option<usize>,

    /// Train cutoff date, dd-mm-yyyy
    #[arg(short, long)]
    train_date: Option<String>,

    /// Compare the forecast with held-out actuals and report MAPE
    #[arg(short, long)]
    evaluate: bool,

    /// Directory receiving the output files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            growth_rate: self.growth_rate,
            horizon_months: self.horizon,
            train_date: self.train_date.clone(),
            evaluate: self.evaluate,
            output_dir: self.output_dir.clone(),
        }
    }
}

fn describe_failure(error: ForecastError) -> anyhow::Error {
    let context = if error.is_configuration() {
        "invalid run parameters, nothing was written"
    } else {
        "forecast run failed"
    };
    anyhow::Error::new(error).context(context)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let cfg = Config::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    let report = Runner::new(cfg)
        .execute(&cli.overrides())
        .map_err(describe_failure)?;

    for column in &report.columns {
        match &column.metrics {
            Some(metrics) => println!("{}: {}", column.name, metrics),
            None => println!("{}: forecast written", column.name),
        }
    }
    for path in &report.outputs {
        println!("wrote {}", path.display());
    }

    info!(run_id = %report.run_id, "done");
    Ok(())
}
