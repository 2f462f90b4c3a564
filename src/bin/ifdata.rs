//! Append newly published IF.data periods to the cumulative table.

use anyhow::Result;
use bcbscraper::{app, config::Config, logging, period::SystemClock};
use tracing::{debug, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (cfg, source) = Config::load()?;
    logging::init(&cfg.log)?;
    debug!(config = ?source, "config loaded");
    info!(output = %cfg.ifdata.output.display(), "starting IF.data update");

    let report = app::run_ifdata(&cfg, &SystemClock).await?;
    info!(dataset = %report.dataset, counts = ?report.counts(), "update complete");
    Ok(())
}
