use anyhow::Result;
use bcbscraper::{app, config::Config, logging, period::SystemClock};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) config & logging ─────────────────────────────────────────
    let (cfg, source) = Config::load()?;
    logging::init(&cfg.log)?;
    info!(config = ?source, "startup");

    let clock = SystemClock;

    // ─── 2) balancetes archives + manifest ───────────────────────────
    let bal = app::run_balancetes(&cfg, &clock).await?;
    info!(dataset = %bal.dataset, persisted = bal.persisted().len(), "done");
    let entries = app::run_manifest(&cfg)?;
    info!(entries = entries.len(), "manifest done");

    // ─── 3) IF.data cumulative table ─────────────────────────────────
    match app::run_ifdata(&cfg, &clock).await {
        Ok(report) => info!(dataset = %report.dataset, persisted = report.persisted().len(), "done"),
        Err(e) => {
            error!("ifdata failed: {:#}", e);
            return Err(e);
        }
    }

    info!("all done");
    Ok(())
}
