// src/history/mod.rs

pub mod files;
pub mod table;

pub use files::{artifact_file_name, PeriodFiles};
pub use table::CumulativeTable;

use crate::period::Period;

/// What is already persisted locally, keyed by period.
pub trait StateStore {
    /// Whether the artifact for `period` is already persisted.
    fn exists(&self, period: Period) -> bool;
    /// The latest persisted period, if any.
    fn latest(&self) -> Option<Period>;
}
