// src/dataset/mod.rs

pub mod archives;
pub mod records;

pub use archives::MonthlyArchives;
pub use records::RecordHistory;

use anyhow::Result;

use crate::error::PeriodError;
use crate::history::StateStore;
use crate::period::Period;

/// A remote per-period source plus the local store it materializes into.
pub trait Dataset: StateStore {
    /// Payload decoded and ready to persist.
    type Decoded;

    fn name(&self) -> &str;

    /// Request URL for `period`.
    fn locator(&self, period: Period) -> String;

    /// First period to enumerate from, given the configured start.
    fn resume_from(&self, configured_start: Period) -> Period {
        configured_start
    }

    fn decode(&self, period: Period, payload: &[u8]) -> Result<Self::Decoded, PeriodError>;

    /// Persist one period, returning how many units (files or rows) were stored.
    /// Errors here are local I/O failures and abort the run.
    fn persist(&mut self, period: Period, decoded: Self::Decoded) -> Result<usize>;

    /// Called once after the last period.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
