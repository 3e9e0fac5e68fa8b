//! All-or-nothing output writes
//!
//! Every file is first written to a hidden temporary sibling. Only when all
//! of them are on disk are they renamed over their targets, so a run that
//! fails part-way leaves the previous outputs in place.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::tables::write_table;
use crate::domain::ForecastTable;
use crate::error::Result;

#[derive(Debug)]
struct Staged {
    temp: PathBuf,
    target: PathBuf,
}

/// Files written to temporary siblings, pending [`StagedWrites::commit`]
#[derive(Debug, Default)]
pub struct StagedWrites {
    staged: Vec<Staged>,
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn stage_with<F>(&mut self, target: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let temp = temp_path(target);
        // Register first so Drop cleans up a partially written file
        self.staged.push(Staged {
            temp: temp.clone(),
            target: target.to_path_buf(),
        });
        let mut writer = BufWriter::new(File::create(&temp)?);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Stage a forecast table as CSV
    pub fn stage_table(&mut self, target: &Path, table: &ForecastTable) -> Result<()> {
        self.stage_with(target, |w| write_table(w, table))
    }

    /// Stage a value as pretty-printed JSON
    pub fn stage_json<T: Serialize>(&mut self, target: &Path, value: &T) -> Result<()> {
        self.stage_with(target, |w| {
            serde_json::to_writer_pretty(&mut *w, value)?;
            Ok(())
        })
    }

    /// Rename every staged file into place; returns the target paths
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);
        let mut targets = Vec::with_capacity(staged.len());
        for (i, file) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(&file.temp, &file.target) {
                for rest in &staged[i..] {
                    let _ = fs::remove_file(&rest.temp);
                }
                return Err(e.into());
            }
            debug!(path = %file.target.display(), "output committed");
            targets.push(file.target.clone());
        }
        Ok(targets)
    }
}

impl Drop for StagedWrites {
    fn drop(&mut self) {
        for file in &self.staged {
            if let Err(e) = fs::remove_file(&file.temp) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %file.temp.display(), error = %e, "failed to remove staged file");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table() -> ForecastTable {
        let mut table =
            ForecastTable::for_horizon(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 1);
        table.push_column("L1", vec![3.0]).unwrap();
        table
    }

    #[test]
    fn test_commit_renames_all() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("forecast.csv");
        let json = dir.path().join("record.json");

        let mut writes = StagedWrites::new();
        writes.stage_table(&csv, &table()).unwrap();
        writes.stage_json(&json, &serde_json::json!({"a": 1})).unwrap();
        assert!(!csv.exists());
        assert!(dir.path().join(".forecast.csv.tmp").exists());

        let written = writes.commit().unwrap();
        assert_eq!(written, vec![csv.clone(), json.clone()]);
        assert!(fs::read_to_string(&csv).unwrap().starts_with("TestDates,L1"));
        assert!(!dir.path().join(".forecast.csv.tmp").exists());
    }

    #[test]
    fn test_drop_without_commit_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("forecast.csv");
        fs::write(&csv, "previous").unwrap();

        {
            let mut writes = StagedWrites::new();
            writes.stage_table(&csv, &table()).unwrap();
        }

        assert_eq!(fs::read_to_string(&csv).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
