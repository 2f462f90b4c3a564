// src/history/table.rs

use anyhow::Result;
use std::{collections::BTreeSet, path::PathBuf};
use tracing::info;

use super::StateStore;
use crate::period::Period;
use crate::process::{read_table, write_table, Record, Table};

/// One CSV table accumulating rows across periods; the checkpoint is the
/// largest value of its period column.
#[derive(Debug)]
pub struct CumulativeTable {
    path: PathBuf,
    table: Table,
    periods: BTreeSet<Period>,
    dirty: bool,
}

impl CumulativeTable {
    /// Load `path` if it exists. An unreadable existing table is an error:
    /// carrying on would overwrite its history with a partial one.
    pub fn load(path: impl Into<PathBuf>, period_column: &str) -> Result<Self> {
        let path = path.into();
        let table = read_table(&path)?.unwrap_or_default();
        let periods = table.periods(period_column);
        if !table.headers.is_empty() && table.column_index(period_column).is_none() {
            info!(path = %path.display(), column = period_column, "table has no period column");
        }
        Ok(Self {
            path,
            table,
            periods,
            dirty: false,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Add `records` fetched for `period` to the in-memory table.
    pub fn append(&mut self, period: Period, records: &[Record]) -> usize {
        let added = self.table.append_records(records);
        if added > 0 {
            self.periods.insert(period);
            self.dirty = true;
        }
        added
    }

    /// Write the table if anything was appended since the last flush.
    /// Returns whether a write happened.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_table(&self.table, &self.path)?;
        self.dirty = false;
        info!(path = %self.path.display(), rows = self.table.rows.len(), "table written");
        Ok(true)
    }
}

impl StateStore for CumulativeTable {
    fn exists(&self, period: Period) -> bool {
        self.periods.contains(&period)
    }

    fn latest(&self) -> Option<Period> {
        self.periods.iter().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn p(s: &str) -> Period {
        s.parse().unwrap()
    }

    #[test]
    fn test_checkpoint_is_max_period() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("IFDATA_Historico.csv");
        fs::write(
            &path,
            "\u{feff}AnoMes,CodInst,Saldo\n202312,A,1\n202401,A,2\n202402,A,3\n202401,B,4\n",
        )
        .unwrap();

        let table = CumulativeTable::load(&path, "AnoMes").unwrap();
        assert_eq!(table.latest(), Some(p("202402")));
        assert_eq!(table.latest().map(|p| p.succ()), Some(p("202403")));
        assert!(table.exists(p("202312")));
        assert!(!table.exists(p("202403")));
    }

    #[test]
    fn test_absent_or_columnless_table_has_no_checkpoint() {
        let tmp = tempdir().unwrap();
        let absent = CumulativeTable::load(tmp.path().join("none.csv"), "AnoMes").unwrap();
        assert_eq!(absent.latest(), None);

        let path = tmp.path().join("other.csv");
        fs::write(&path, "CodInst,Saldo\nA,1\n").unwrap();
        let columnless = CumulativeTable::load(&path, "AnoMes").unwrap();
        assert_eq!(columnless.latest(), None);
    }

    #[test]
    fn test_corrupt_table_is_hard_failure() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("IFDATA_Historico.csv");
        fs::write(&path, "AnoMes,CodInst\n202401\n").unwrap();
        assert!(CumulativeTable::load(&path, "AnoMes").is_err());
    }

    #[test]
    fn test_flush_only_when_dirty() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("IFDATA_Historico.csv");
        let mut table = CumulativeTable::load(&path, "AnoMes").unwrap();

        assert!(!table.flush().unwrap());
        assert!(!path.exists());

        let rows = json!([{"AnoMes": 202403, "CodInst": "A"}]);
        let records: Vec<Record> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        assert_eq!(table.append(p("202403"), &records), 1);
        assert!(table.flush().unwrap());
        assert!(!table.flush().unwrap());

        let reloaded = CumulativeTable::load(&path, "AnoMes").unwrap();
        assert_eq!(reloaded.latest(), Some(p("202403")));
        assert_eq!(reloaded.table().rows.len(), 1);
    }
}
