//! Roll-up of forecast columns into reporting categories

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::forecast::ForecastTable;
use crate::error::Result;

/// Category name → source target columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(pub BTreeMap<String, Vec<String>>);

impl Default for CategoryMap {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert("residential".to_string(), vec!["L1".to_string()]);
        map.insert("commercial".to_string(), vec!["L2".to_string()]);
        map.insert(
            "industrial".to_string(),
            vec!["L3".to_string(), "L4".to_string()],
        );
        map.insert("agriculture".to_string(), vec!["L5".to_string()]);
        map.insert(
            "others".to_string(),
            (6..=11).map(|i| format!("L{}", i)).collect(),
        );
        Self(map)
    }
}

impl CategoryMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum the source columns of every category, date by date.
    ///
    /// Sources missing from `table` contribute nothing.
    pub fn aggregate(&self, table: &ForecastTable) -> Result<ForecastTable> {
        let mut out = table.with_dates_only();
        for (category, sources) in &self.0 {
            let mut sums = vec![0.0; table.len()];
            for values in sources.iter().filter_map(|s| table.column(s)) {
                for (sum, v) in sums.iter_mut().zip(values) {
                    *sum += v;
                }
            }
            out.push_column(category.clone(), sums)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_mapping() {
        let map = CategoryMap::default();
        assert_eq!(map.0.len(), 5);
        assert_eq!(map.0["others"].len(), 6);
    }

    #[test]
    fn test_aggregate_sums_available_sources() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut table = ForecastTable::for_horizon(cutoff, 2);
        table.push_column("L3", vec![1.0, 2.0]).unwrap();
        table.push_column("L4", vec![10.0, 20.0]).unwrap();
        table.push_column("L1", vec![5.0, 5.0]).unwrap();

        let rolled = CategoryMap::default().aggregate(&table).unwrap();
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled.column("industrial"), Some(&[11.0, 22.0][..]));
        assert_eq!(rolled.column("residential"), Some(&[5.0, 5.0][..]));
        // L6..L11 absent
        assert_eq!(rolled.column("others"), Some(&[0.0, 0.0][..]));
    }
}
