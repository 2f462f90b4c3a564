//! Download any missing monthly balance-sheet archives, then rebuild the manifest.

use anyhow::Result;
use bcbscraper::{app, config::Config, logging, period::SystemClock};
use tracing::{debug, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (cfg, source) = Config::load()?;
    logging::init(&cfg.log)?;
    debug!(config = ?source, "config loaded");

    let report = app::run_balancetes(&cfg, &SystemClock).await?;
    for (period, outcome) in &report.outcomes {
        info!(%period, outcome = outcome.as_str());
    }
    app::run_manifest(&cfg)?;
    Ok(())
}
