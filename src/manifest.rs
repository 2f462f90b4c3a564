// src/manifest.rs

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ManifestConfig;
use crate::period::Period;
use crate::process::{write_table, Table};

pub const HEADER: [&str; 2] = ["ano_mes", "link"];

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub period: Period,
    pub locator: String,
}

/// Period → artifact path for every `*.csv` under `root` whose name starts with
/// `YYYYMM`, never including `manifest_path` itself. Duplicate periods keep the
/// lexicographically first path.
pub fn scan_artifacts(root: &Path, manifest_path: &Path) -> Result<BTreeMap<Period, PathBuf>> {
    let pattern = format!("{}/**/*.csv", Pattern::escape(&root.to_string_lossy()));
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid glob pattern {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "cannot read glob entry");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut found: BTreeMap<Period, PathBuf> = BTreeMap::new();
    for path in paths {
        if same_file(&path, manifest_path) {
            debug!(path = %path.display(), "skipping manifest itself");
            continue;
        }
        let Some(period) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(Period::from_name_prefix)
        else {
            debug!(path = %path.display(), "no period in file name");
            continue;
        };
        if let Some(kept) = found.get(&period) {
            warn!(%period, kept = %kept.display(), ignored = %path.display(), "duplicate period");
            continue;
        }
        found.insert(period, path);
    }
    Ok(found)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// `path` without any `.` components, so `./Balancetes/x` and `Balancetes/x`
/// compare equal. glob drops a leading `./` from the paths it yields.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Join a root-relative artifact path onto `base`: URL join when `base` is an
/// absolute URL, plain prefixing otherwise.
pub fn locator_for(base: &str, root: &Path, path: &Path) -> Result<String> {
    let (root, path) = (without_cur_dir(root), without_cur_dir(path));
    let rel = path
        .strip_prefix(&root)
        .with_context(|| format!("{} is not under {}", path.display(), root.display()))?;
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let base = if base.is_empty() || base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };

    match Url::parse(&base) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url
            .join(&rel)
            .with_context(|| format!("joining {} onto {}", rel, base))?
            .to_string()),
        _ => Ok(format!("{}{}", base, rel)),
    }
}

/// Entries for every artifact under `root`, ascending by period.
pub fn build_manifest(root: &Path, cfg: &ManifestConfig) -> Result<Vec<ManifestEntry>> {
    scan_artifacts(root, &cfg.path)?
        .into_iter()
        .map(|(period, path)| {
            Ok(ManifestEntry {
                period,
                locator: locator_for(&cfg.base, root, &path)?,
            })
        })
        .collect()
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let mut table = Table::new(HEADER.iter().map(|h| h.to_string()).collect());
    table.rows = entries
        .iter()
        .map(|e| vec![e.period.to_string(), e.locator.clone()])
        .collect();
    write_table(&table, path)
}

/// Rebuild the manifest from a fresh scan of `root` and write it to `cfg.path`.
pub fn generate(root: &Path, cfg: &ManifestConfig) -> Result<Vec<ManifestEntry>> {
    let entries = build_manifest(root, cfg)?;
    write_manifest(&cfg.path, &entries)?;
    info!(path = %cfg.path.display(), entries = entries.len(), "manifest written");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_manifest_sorted_and_self_excluding() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("Balancetes");
        touch(&root.join("2024").join("202401SOCIEDADES.csv"));
        touch(&root.join("2023").join("202312SOCIEDADES.csv"));
        touch(&root.join("notes.csv"));
        let cfg = ManifestConfig {
            path: root.join("links.csv"),
            base: "https://data.example.org/balancetes".to_string(),
        };

        let entries = generate(&root, &cfg).unwrap();
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    period: "202312".parse().unwrap(),
                    locator: "https://data.example.org/balancetes/2023/202312SOCIEDADES.csv".into(),
                },
                ManifestEntry {
                    period: "202401".parse().unwrap(),
                    locator: "https://data.example.org/balancetes/2024/202401SOCIEDADES.csv".into(),
                },
            ]
        );

        let text = fs::read_to_string(&cfg.path).unwrap();
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ano_mes,link");
        assert!(lines[1].starts_with("202312,"));
        assert!(lines[2].starts_with("202401,"));
    }

    #[test]
    fn test_manifest_is_idempotent() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        touch(&root.join("2024").join("202402SOCIEDADES.csv"));
        // named like an artifact on purpose: it must still never index itself
        let cfg = ManifestConfig {
            path: root.join("2023").join("202312_links.csv"),
            base: "Balancetes/".to_string(),
        };

        generate(&root, &cfg).unwrap();
        let first = fs::read(&cfg.path).unwrap();
        let entries = generate(&root, &cfg).unwrap();
        let second = fs::read(&cfg.path).unwrap();

        assert_eq!(first, second);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].locator, "Balancetes/2024/202402SOCIEDADES.csv");
    }

    #[test]
    fn test_duplicate_period_keeps_first_path() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        touch(&root.join("2024").join("202401A.csv"));
        touch(&root.join("2024").join("202401B.csv"));
        let found = scan_artifacts(&root, &root.join("links.csv")).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.values().next().unwrap().ends_with("202401A.csv"));
    }

    #[test]
    fn test_locator_for_plain_prefix() {
        let root = Path::new("Balancetes");
        let path = root.join("2024").join("202401SOCIEDADES.csv");
        assert_eq!(
            locator_for("", root, &path).unwrap(),
            "2024/202401SOCIEDADES.csv"
        );
        assert_eq!(
            locator_for("data", root, &path).unwrap(),
            "data/2024/202401SOCIEDADES.csv"
        );
    }

    #[test]
    fn test_locator_for_dot_relative_root() {
        let path = Path::new("Balancetes/2024/202401SOCIEDADES.csv");
        assert_eq!(
            locator_for("Balancetes/", Path::new("./Balancetes"), path).unwrap(),
            "Balancetes/2024/202401SOCIEDADES.csv"
        );
        assert_eq!(
            locator_for("", Path::new("Balancetes"), Path::new("./Balancetes/2024/202401SOCIEDADES.csv"))
                .unwrap(),
            "2024/202401SOCIEDADES.csv"
        );
        assert!(locator_for("", Path::new("./Other"), path).is_err());
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("data[2024]");
        touch(&root.join("2024").join("202401SOCIEDADES.csv"));
        let cfg = ManifestConfig {
            path: root.join("links.csv"),
            base: "https://data.example.org/bal/".to_string(),
        };

        let entries = generate(&root, &cfg).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].locator,
            "https://data.example.org/bal/2024/202401SOCIEDADES.csv"
        );
    }
}
