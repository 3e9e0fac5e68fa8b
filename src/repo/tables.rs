//! CSV input tables and forecast table output

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use tracing::info;

use crate::domain::{
    parse_table_date, ClimateRecord, CovariateTable, ForecastTable, HistoricalTable, TargetColumn,
};
use crate::error::{ForecastError, Result};

fn open_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| {
        ForecastError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open {}: {}", path.display(), e),
        ))
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Load the historical table: the date column plus each target column.
///
/// Other columns are ignored.
pub fn load_history(path: &Path, date_column: &str, targets: &[String]) -> Result<HistoricalTable> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    };
    let date_idx = position(date_column)?;
    let target_idx = targets
        .iter()
        .map(|name| position(name))
        .collect::<Result<Vec<_>>>()?;

    let mut dates = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); targets.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        dates.push(parse_table_date(field(date_idx))?);
        for ((column, &idx), name) in values.iter_mut().zip(&target_idx).zip(targets) {
            let raw = field(idx);
            let value = raw.parse::<f64>().map_err(|_| ForecastError::InvalidValue {
                column: name.clone(),
                row,
                value: raw.to_string(),
            })?;
            column.push(value);
        }
    }

    let columns = targets
        .iter()
        .cloned()
        .zip(values)
        .map(|(name, values)| TargetColumn { name, values })
        .collect();

    let table = HistoricalTable::new(dates, columns)?;
    info!(path = %path.display(), rows = table.len(), columns = targets.len(), "historical table loaded");
    Ok(table)
}

/// Load the climate table and derive its covariates
pub fn load_climate(path: &Path) -> Result<CovariateTable> {
    let mut reader = open_reader(path)?;
    let records = reader
        .deserialize::<ClimateRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let table = CovariateTable::prepare(records)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        rain_threshold = table.rain_lag1_mean,
        "climate table loaded"
    );
    Ok(table)
}

/// Write `table` as CSV: `TestDates` then one column per target
pub fn write_table<W: Write>(writer: W, table: &ForecastTable) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.header())?;
    for record in table.records() {
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}
