//! Rebuild the `ano_mes,link` manifest from whatever artifacts are on disk.

use anyhow::Result;
use bcbscraper::{app, config::Config, logging};
use tracing::{debug, info};

fn main() -> Result<()> {
    let (cfg, source) = Config::load()?;
    logging::init(&cfg.log)?;
    debug!(config = ?source, "config loaded");

    let entries = app::run_manifest(&cfg)?;
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        info!(first = %first.period, last = %last.period, "indexed {} periods", entries.len());
    }
    Ok(())
}
