// src/dataset/archives.rs

use anyhow::Result;
use tracing::{debug, info, warn};

use super::Dataset;
use crate::config::BalancetesConfig;
use crate::error::PeriodError;
use crate::fetch::render_template;
use crate::history::{PeriodFiles, StateStore};
use crate::period::Period;
use crate::process::{unzip, write_atomic, ArchiveMember};

/// Monthly ZIP archives, each holding one CSV written to `<root>/<YYYY>/`.
#[derive(Debug, Clone)]
pub struct MonthlyArchives {
    files: PeriodFiles,
    url_template: String,
    member_extension: String,
}

impl MonthlyArchives {
    pub fn new(cfg: &BalancetesConfig) -> Self {
        Self {
            files: PeriodFiles::new(&cfg.output_dir, &cfg.url_template, &cfg.archive_suffix),
            url_template: cfg.url_template.clone(),
            member_extension: cfg.member_extension.clone(),
        }
    }

    pub fn files(&self) -> &PeriodFiles {
        &self.files
    }
}

impl StateStore for MonthlyArchives {
    fn exists(&self, period: Period) -> bool {
        self.files.exists(period)
    }

    fn latest(&self) -> Option<Period> {
        self.files.latest()
    }
}

impl Dataset for MonthlyArchives {
    type Decoded = ArchiveMember;

    fn name(&self) -> &str {
        "balancetes"
    }

    fn locator(&self, period: Period) -> String {
        render_template(&self.url_template, period)
    }

    fn decode(&self, period: Period, payload: &[u8]) -> Result<ArchiveMember, PeriodError> {
        let mut wanted = unzip(payload)?
            .into_iter()
            .filter(|m| m.has_extension(&self.member_extension));

        let Some(first) = wanted.next() else {
            debug!(%period, ext = %self.member_extension, "archive has no matching member");
            return Err(PeriodError::EmptyResult);
        };
        for extra in wanted {
            warn!(%period, kept = %first.name, ignored = %extra.name, "archive holds more than one member");
        }
        Ok(first)
    }

    fn persist(&mut self, period: Period, member: ArchiveMember) -> Result<usize> {
        let path = self.files.path_for(period);
        write_atomic(&path, &member.bytes)?;
        info!(%period, member = %member.name, path = %path.display(), bytes = member.bytes.len(), "saved");
        Ok(1)
    }
}
