use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForecastError, Result};

// ============================================================================
// Date Helpers
// ============================================================================

/// Format of the train-cutoff date and of the climate `DateTime` labels.
pub const LABEL_DATE_FORMAT: &str = "%d-%m-%Y";

/// Format used when writing output dates.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats accepted for dates found in input tables.
const INPUT_DATE_FORMATS: [&str; 3] = [LABEL_DATE_FORMAT, "%Y-%m-%d", "%d/%m/%Y"];

/// Parse a date label in the fixed `dd-mm-yyyy` format
pub fn parse_label_date(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), LABEL_DATE_FORMAT)
        .map_err(|_| ForecastError::DateParse(label.to_string()))
}

/// Parse a date from an input table, trying every accepted format in turn
pub fn parse_table_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    INPUT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ForecastError::DateParse(value.to_string()))
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `count` consecutive month starts, beginning the month after `cutoff`
pub fn months_after(cutoff: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let first = month_start(cutoff);
    (1..=count as u32)
        .filter_map(|offset| first.checked_add_months(Months::new(offset)))
        .collect()
}

// ============================================================================
// Year-Month Key
// ============================================================================

/// Calendar month used to compare rows of independently loaded tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_date() {
        let date = parse_label_date("01-03-2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(parse_label_date("2025-03-01").is_err());
    }

    #[test]
    fn test_parse_table_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(parse_table_date("01-11-2024").unwrap(), expected);
        assert_eq!(parse_table_date("2024-11-01").unwrap(), expected);
        assert_eq!(parse_table_date("01/11/2024").unwrap(), expected);
        assert!(parse_table_date("Nov 2024").is_err());
    }

    #[test]
    fn test_months_after_crosses_year() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        let dates = months_after(cutoff, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_year_month_display() {
        let ym = YearMonth::from(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
        assert_eq!(ym.to_string(), "2023-04");
    }
}
