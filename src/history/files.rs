// src/history/files.rs

use glob::{glob, Pattern};
use std::path::PathBuf;
use tracing::{trace, warn};

use super::StateStore;
use crate::fetch::render_template;
use crate::period::Period;

/// One file per period at `<root>/<YYYY>/<name>`, the name derived from the
/// remote file name of the period's URL.
#[derive(Debug, Clone)]
pub struct PeriodFiles {
    root: PathBuf,
    source_name_template: String,
    archive_suffix: String,
}

impl PeriodFiles {
    /// `url_template` is the download template; its last path segment names the artifact.
    pub fn new(root: impl Into<PathBuf>, url_template: &str, archive_suffix: &str) -> Self {
        let without_query = url_template.split('?').next().unwrap_or(url_template);
        let source_name_template = without_query
            .rsplit('/')
            .next()
            .unwrap_or(without_query)
            .to_string();
        Self {
            root: root.into(),
            source_name_template,
            archive_suffix: archive_suffix.to_string(),
        }
    }

    pub fn year_dir(&self, period: Period) -> PathBuf {
        self.root.join(format!("{:04}", period.year()))
    }

    pub fn file_name(&self, period: Period) -> String {
        let source = render_template(&self.source_name_template, period);
        artifact_file_name(&source, &self.archive_suffix)
    }

    pub fn path_for(&self, period: Period) -> PathBuf {
        self.year_dir(period).join(self.file_name(period))
    }
}

impl StateStore for PeriodFiles {
    fn exists(&self, period: Period) -> bool {
        self.path_for(period).is_file()
    }

    fn latest(&self) -> Option<Period> {
        let pattern = format!("{}/*/*", Pattern::escape(&self.root.to_string_lossy()));
        let entries = match glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid glob pattern");
                return None;
            }
        };
        entries
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                if name.ends_with(".tmp") {
                    return None;
                }
                let period = Period::from_name_prefix(name)?;
                trace!(path = %path.display(), %period, "found artifact");
                Some(period)
            })
            .max()
    }
}

/// `202412SOCIEDADES.CSV.zip` → `202412SOCIEDADES.csv`: drop the archive
/// suffix (case-insensitive) and lowercase the remaining extension.
pub fn artifact_file_name(source_name: &str, archive_suffix: &str) -> String {
    let suffix_len = archive_suffix.len();
    let stripped = if !archive_suffix.is_empty()
        && source_name.len() > suffix_len
        && source_name
            .get(source_name.len() - suffix_len..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(archive_suffix))
    {
        &source_name[..source_name.len() - suffix_len]
    } else {
        source_name
    };

    match stripped.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}", stem, ext.to_ascii_lowercase()),
        _ => stripped.to_string(),
    }
}
