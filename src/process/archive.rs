// src/process/archive.rs

use std::io::{Cursor, Read};
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::error::PeriodError;

/// One decompressed file from a ZIP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveMember {
    /// Case-insensitive extension check, `ext` without the dot.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.name
            .rsplit_once('.')
            .map(|(_, e)| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false)
    }
}

/// Decompress every file entry held in `bytes`, in archive order.
pub fn unzip(bytes: &[u8]) -> Result<Vec<ArchiveMember>, PeriodError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PeriodError::MalformedPayload(format!("not a ZIP archive: {}", e)))?;

    let mut members = Vec::with_capacity(archive.len());
    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|e| PeriodError::MalformedPayload(format!("ZIP entry {}: {}", idx, e)))?;
        if entry.is_dir() {
            trace!(name = entry.name(), "skipping directory entry");
            continue;
        }
        let name = entry.name().to_string();
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| PeriodError::MalformedPayload(format!("reading {}: {}", name, e)))?;
        debug!(name = %name, bytes = buf.len(), "extracted member");
        members.push(ArchiveMember { name, bytes: buf });
    }
    Ok(members)
}
