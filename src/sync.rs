// src/sync.rs

use anyhow::Result;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::dataset::Dataset;
use crate::error::PeriodError;
use crate::fetch::Fetcher;
use crate::period::{enumerate_periods, Clock, Period};

/// Terminal state of one period in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodOutcome {
    /// Already persisted by an earlier run; nothing fetched.
    Skipped,
    /// Stored `units` files or rows.
    Persisted { units: usize },
    Failed(PeriodError),
}

impl PeriodOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodOutcome::Skipped => "SKIPPED",
            PeriodOutcome::Persisted { .. } => "PERSISTED",
            PeriodOutcome::Failed(PeriodError::Transport(_)) => "TRANSPORT_FAILED",
            PeriodOutcome::Failed(PeriodError::NotFound { .. }) => "NOT_FOUND",
            PeriodOutcome::Failed(PeriodError::MalformedPayload(_)) => "DECODE_FAILED",
            PeriodOutcome::Failed(PeriodError::EmptyResult) => "EMPTY",
        }
    }
}

/// Where to start and how long each request may take.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub start: Period,
    pub timeout: Duration,
}

/// Outcome of every enumerated period, in processing order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub dataset: String,
    pub outcomes: Vec<(Period, PeriodOutcome)>,
}

impl SyncReport {
    pub fn outcome(&self, period: Period) -> Option<&PeriodOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, o)| o)
    }

    /// Number of periods per state name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, outcome) in &self.outcomes {
            *counts.entry(outcome.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn persisted(&self) -> Vec<Period> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, PeriodOutcome::Persisted { .. }))
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Fetch and persist every missing period from the resume point through today.
///
/// Periods are handled one at a time in ascending order. Per-period failures are
/// logged and recorded in the report; only local persistence errors are returned.
#[instrument(level = "info", skip_all, fields(dataset = dataset.name()))]
pub async fn sync_dataset<F, D, C>(
    fetcher: &F,
    dataset: &mut D,
    clock: &C,
    opts: &SyncOptions,
) -> Result<SyncReport>
where
    F: Fetcher,
    D: Dataset,
    C: Clock + ?Sized,
{
    let resume = dataset.resume_from(opts.start);
    let periods = enumerate_periods(resume, clock.today());
    info!(
        checkpoint = ?dataset.latest().map(|p| p.to_string()),
        from = %resume,
        planned = periods.len(),
        "starting sync"
    );

    let mut report = SyncReport {
        dataset: dataset.name().to_string(),
        outcomes: Vec::with_capacity(periods.len()),
    };

    for period in periods {
        let outcome = if dataset.exists(period) {
            info!(%period, "already present, skipping");
            PeriodOutcome::Skipped
        } else {
            let url = dataset.locator(period);
            match fetch_and_decode(fetcher, &*dataset, period, &url, opts.timeout).await {
                Ok(decoded) => {
                    let units = dataset.persist(period, decoded)?;
                    PeriodOutcome::Persisted { units }
                }
                Err(e) => {
                    log_failure(period, &url, &e);
                    PeriodOutcome::Failed(e)
                }
            }
        };
        debug!(%period, outcome = outcome.as_str(), "period done");
        report.outcomes.push((period, outcome));
    }

    dataset.finish()?;

    info!(counts = ?report.counts(), "sync finished");
    Ok(report)
}

async fn fetch_and_decode<F, D>(
    fetcher: &F,
    dataset: &D,
    period: Period,
    url: &str,
    timeout: Duration,
) -> Result<D::Decoded, PeriodError>
where
    F: Fetcher,
    D: Dataset,
{
    info!(%period, %url, "downloading");
    let resp = fetcher
        .fetch(url, timeout)
        .await
        .map_err(|e| PeriodError::Transport(e.to_string()))?;
    if !resp.is_success() {
        return Err(PeriodError::NotFound {
            status: resp.status,
        });
    }
    dataset.decode(period, &resp.body)
}

fn log_failure(period: Period, url: &str, e: &PeriodError) {
    match e {
        PeriodError::NotFound { status } => info!(%period, %url, status, "not published yet"),
        PeriodError::EmptyResult => warn!(%period, %url, "no records"),
        PeriodError::MalformedPayload(reason) => warn!(%period, %url, %reason, "could not decode"),
        PeriodError::Transport(reason) => error!(%period, %url, %reason, "transport error"),
    }
}
