// src/error.rs

use thiserror::Error;

/// Why one period could not be materialized. None of these abort a batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// Connect, DNS, timeout or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status, usually "not published yet".
    #[error("not found (HTTP {status})")]
    NotFound { status: u16 },

    /// The bytes are not the expected container or document.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Well-formed response carrying zero records.
    #[error("empty result")]
    EmptyResult,
}
