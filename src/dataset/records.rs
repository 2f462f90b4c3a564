// src/dataset/records.rs

use anyhow::Result;

use super::Dataset;
use crate::config::IfDataConfig;
use crate::error::PeriodError;
use crate::fetch::render_template;
use crate::history::{CumulativeTable, StateStore};
use crate::period::Period;
use crate::process::{decode_json_records, Record};

/// OData records per period, accumulated into one cumulative table.
#[derive(Debug)]
pub struct RecordHistory {
    table: CumulativeTable,
    url_template: String,
    flush_each_period: bool,
}

impl RecordHistory {
    /// Load the existing table; fails if it exists but cannot be read.
    pub fn load(cfg: &IfDataConfig) -> Result<Self> {
        Ok(Self {
            table: CumulativeTable::load(&cfg.output, &cfg.period_column)?,
            url_template: cfg.url_template.clone(),
            flush_each_period: cfg.flush_each_period,
        })
    }

    pub fn table(&self) -> &CumulativeTable {
        &self.table
    }
}

impl StateStore for RecordHistory {
    fn exists(&self, period: Period) -> bool {
        self.table.exists(period)
    }

    fn latest(&self) -> Option<Period> {
        self.table.latest()
    }
}

impl Dataset for RecordHistory {
    type Decoded = Vec<Record>;

    fn name(&self) -> &str {
        "ifdata"
    }

    fn locator(&self, period: Period) -> String {
        render_template(&self.url_template, period)
    }

    /// Resume one month after the table's checkpoint.
    fn resume_from(&self, configured_start: Period) -> Period {
        self.latest().map(|p| p.succ()).unwrap_or(configured_start)
    }

    fn decode(&self, _period: Period, payload: &[u8]) -> Result<Vec<Record>, PeriodError> {
        let records = decode_json_records(payload)?;
        if records.is_empty() {
            return Err(PeriodError::EmptyResult);
        }
        Ok(records)
    }

    fn persist(&mut self, period: Period, records: Vec<Record>) -> Result<usize> {
        let added = self.table.append(period, &records);
        if self.flush_each_period {
            self.table.flush()?;
        }
        Ok(added)
    }

    fn finish(&mut self) -> Result<()> {
        self.table.flush()?;
        Ok(())
    }
}
