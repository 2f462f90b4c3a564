// src/logging.rs

use anyhow::{Context, Result};
use std::{env, fs::OpenOptions, sync::Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Install the global subscriber: stderr always, plus an append-only log file
/// when `cfg.file` is set. `RUST_LOG` replaces `cfg.filter`; `LOG_LEVEL` adds a directive.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter));
    if let Ok(level) = env::var("LOG_LEVEL") {
        match level.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring LOG_LEVEL={}: {}", level, e),
        }
    }

    let file_layer = match &cfg.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}
