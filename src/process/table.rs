// src/process/table.rs

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{collections::BTreeSet, fs, io, path::Path};
use tracing::{debug, warn};

use super::persist::write_atomic;
use super::records::{cell_text, Record};
use crate::period::Period;

/// UTF-8 byte-order mark, written so spreadsheet tools pick the right encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const DELIMITER: u8 = b',';

/// A header row plus string cells; every row is as wide as `headers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append JSON records. Unseen keys become new trailing columns and
    /// cells missing from a record stay empty. Returns rows added.
    pub fn append_records(&mut self, records: &[Record]) -> usize {
        for record in records {
            for key in record.keys() {
                if self.column_index(key).is_none() {
                    self.headers.push(key.clone());
                }
            }
        }
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        for record in records {
            let row = self
                .headers
                .iter()
                .map(|h| record.get(h).map(cell_text).unwrap_or_default())
                .collect();
            self.rows.push(row);
        }
        records.len()
    }

    /// Every parseable period in `column`; empty when the column is absent.
    pub fn periods(&self, column: &str) -> BTreeSet<Period> {
        let Some(idx) = self.column_index(column) else {
            return BTreeSet::new();
        };
        let mut out = BTreeSet::new();
        let mut unparseable = 0usize;
        for row in &self.rows {
            match row.get(idx).and_then(|cell| parse_period_cell(cell)) {
                Some(p) => {
                    out.insert(p);
                }
                None => unparseable += 1,
            }
        }
        if unparseable > 0 {
            warn!(column, unparseable, "cells without a YYYYMM period");
        }
        out
    }

    /// BOM + comma-delimited CSV bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = UTF8_BOM.to_vec();
        {
            let mut writer = WriterBuilder::new()
                .delimiter(DELIMITER)
                .from_writer(&mut buf);
            if !self.headers.is_empty() {
                writer
                    .write_record(&self.headers)
                    .context("writing table header")?;
            }
            for row in &self.rows {
                writer.write_record(row).context("writing table row")?;
            }
            writer.flush().context("flushing table")?;
        }
        Ok(buf)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .from_reader(bytes);
        let headers: Vec<String> = reader
            .headers()
            .context("reading table header")?
            .iter()
            .map(str::to_string)
            .collect();
        let mut table = Table::new(headers);
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("reading table row {}", i + 1))?;
            table.rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }
}

/// `202403`, `"202403"` or pandas-style `202403.0`.
fn parse_period_cell(cell: &str) -> Option<Period> {
    let cell = cell.trim();
    let digits = match cell.split_once('.') {
        Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
        Some(_) => return None,
        None => cell,
    };
    digits.parse().ok()
}

/// Load a table from disk. `Ok(None)` when the file does not exist; any other
/// read or parse failure is an error, since the file holds history that must not be lost.
pub fn read_table(path: &Path) -> Result<Option<Table>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing table");
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading table {}", path.display()));
        }
    };
    let table = Table::from_csv_bytes(&bytes)
        .with_context(|| format!("parsing table {}", path.display()))?;
    debug!(path = %path.display(), rows = table.rows.len(), "loaded table");
    Ok(Some(table))
}

/// Replace `path` with `table`, atomically.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let bytes = table.to_csv_bytes()?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), rows = table.rows.len(), "wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(v: serde_json::Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_append_widens_columns() {
        let mut table = Table::default();
        table.append_records(&[record(json!({"AnoMes": 202312, "CodInst": "A"}))]);
        table.append_records(&[record(json!({"AnoMes": 202401, "Saldo": 10.5}))]);

        assert_eq!(table.headers, vec!["AnoMes", "CodInst", "Saldo"]);
        assert_eq!(table.rows[0], vec!["202312", "A", ""]);
        assert_eq!(table.rows[1], vec!["202401", "", "10.5"]);
    }

    #[test]
    fn test_round_trip_keeps_accents_and_bom() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("IFDATA_Historico.csv");
        let mut table = Table::default();
        table.append_records(&[record(json!({"NomeInstituicao": "Banco São João, S.A.", "AnoMes": "202403"}))]);

        write_table(&table, &path).unwrap();
        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM));

        let loaded = read_table(&path).unwrap().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_missing_table_is_none() {
        let tmp = tempdir().unwrap();
        assert!(read_table(&tmp.path().join("absent.csv")).unwrap().is_none());
    }

    #[test]
    fn test_ragged_table_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.csv");
        fs::write(&path, "AnoMes,CodInst\n202401,A\n202402\n").unwrap();
        assert!(read_table(&path).is_err());
    }

    #[test]
    fn test_periods_accept_float_cells() {
        let table = Table {
            headers: vec!["CodInst".into(), "AnoMes".into()],
            rows: vec![
                vec!["A".into(), "202401".into()],
                vec!["B".into(), "202312".into()],
                vec!["C".into(), "202402.0".into()],
                vec!["D".into(), "".into()],
            ],
        };
        let periods: Vec<String> = table.periods("AnoMes").iter().map(|p| p.to_string()).collect();
        assert_eq!(periods, vec!["202312", "202401", "202402"]);
        assert!(table.periods("Missing").is_empty());
        assert!(Table::default().periods("AnoMes").is_empty());
    }
}
