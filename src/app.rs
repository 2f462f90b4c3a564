// src/app.rs

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::dataset::{MonthlyArchives, RecordHistory};
use crate::fetch::HttpFetcher;
use crate::manifest::{self, ManifestEntry};
use crate::period::Clock;
use crate::sync::{sync_dataset, SyncOptions, SyncReport};

/// Mirror the monthly balance-sheet archives.
pub async fn run_balancetes<C: Clock + ?Sized>(cfg: &Config, clock: &C) -> Result<SyncReport> {
    let bal = &cfg.balancetes;
    let fetcher = HttpFetcher::new(&bal.http)?;
    let mut dataset = MonthlyArchives::new(bal);
    let opts = SyncOptions {
        start: bal.start,
        timeout: bal.http.timeout(),
    };
    sync_dataset(&fetcher, &mut dataset, clock, &opts).await
}

/// Extend the cumulative IF.data table.
pub async fn run_ifdata<C: Clock + ?Sized>(cfg: &Config, clock: &C) -> Result<SyncReport> {
    let ifd = &cfg.ifdata;
    let fetcher = HttpFetcher::new(&ifd.http)?;
    let mut dataset = RecordHistory::load(ifd)?;
    let opts = SyncOptions {
        start: ifd.start,
        timeout: ifd.http.timeout(),
    };
    sync_dataset(&fetcher, &mut dataset, clock, &opts).await
}

/// Rebuild the balancetes manifest.
pub fn run_manifest(cfg: &Config) -> Result<Vec<ManifestEntry>> {
    let root = &cfg.balancetes.output_dir;
    if !root.is_dir() {
        info!(root = %root.display(), "no artifacts yet; writing empty manifest");
    }
    manifest::generate(root, &cfg.manifest)
}
