// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::period::Period;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BCBSCRAPER_CONFIG";
/// Looked up in the working directory when `CONFIG_ENV` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "bcbscraper.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub balancetes: BalancetesConfig,
    pub ifdata: IfDataConfig,
    pub manifest: ManifestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,bcbscraper=debug`.
    pub filter: String,
    /// Also append log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 2,
            initial_backoff_ms: 500,
            user_agent: concat!("bcbscraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Monthly balance-sheet archives, one CSV per period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancetesConfig {
    pub url_template: String,
    pub output_dir: PathBuf,
    pub start: Period,
    /// Stripped from the remote file name to name the artifact.
    pub archive_suffix: String,
    /// Only archive members with this extension are extracted.
    pub member_extension: String,
    pub http: HttpConfig,
}

impl Default for BalancetesConfig {
    fn default() -> Self {
        Self {
            url_template:
                "https://www.bcb.gov.br/content/estabilidadefinanceira/cosif/Sociedades/{period}SOCIEDADES.csv.zip"
                    .to_string(),
            output_dir: PathBuf::from("Balancetes"),
            start: Period::known(2024, 12),
            archive_suffix: ".zip".to_string(),
            member_extension: "csv".to_string(),
            http: HttpConfig::default(),
        }
    }
}

/// IF.data OData values, accumulated into one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IfDataConfig {
    pub url_template: String,
    pub output: PathBuf,
    pub period_column: String,
    pub start: Period,
    /// Rewrite the table after every period that adds rows instead of once at the end.
    pub flush_each_period: bool,
    pub http: HttpConfig,
}

impl Default for IfDataConfig {
    fn default() -> Self {
        Self {
            url_template: concat!(
                "https://olinda.bcb.gov.br/olinda/servico/IFDATA/versao/v1/odata/",
                "IfDataValores(AnoMes=@AnoMes,TipoInstituicao=@TipoInstituicao,Relatorio=@Relatorio)",
                "?@AnoMes={period}&@TipoInstituicao=1&@Relatorio='1'&$format=json"
            )
            .to_string(),
            output: PathBuf::from("IFDATA_Historico.csv"),
            period_column: "AnoMes".to_string(),
            start: Period::known(2024, 3),
            flush_each_period: true,
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub path: PathBuf,
    /// URL or path prefix that artifact paths (relative to the balancetes root) are joined onto.
    pub base: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Balancetes/links.csv"),
            base: "Balancetes/".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `$BCBSCRAPER_CONFIG`, else `./bcbscraper.yaml` if present, else defaults.
    /// Also returns the file that was read, for logging once a subscriber exists.
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        match locate(env::var_os(CONFIG_ENV), Path::new(DEFAULT_CONFIG_FILE)) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}

/// An explicit path always wins, even if it does not exist, so a typo fails loudly.
fn locate(explicit: Option<OsString>, local: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(PathBuf::from(path)),
        None if local.is_file() => Some(local.to_path_buf()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_upstream_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.balancetes.start.to_string(), "202412");
        assert_eq!(cfg.ifdata.start.to_string(), "202403");
        assert_eq!(cfg.ifdata.period_column, "AnoMes");
        assert!(cfg.ifdata.url_template.contains("@AnoMes={period}"));
        assert_eq!(cfg.balancetes.http.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml(
            r#"
balancetes:
  start: 202312
  output_dir: out/bal
ifdata:
  flush_each_period: false
  http:
    timeout_secs: 5
log:
  file: IFDATA_LOG.txt
"#,
        )
        .unwrap();
        assert_eq!(cfg.balancetes.start.to_string(), "202312");
        assert_eq!(cfg.balancetes.output_dir, PathBuf::from("out/bal"));
        assert_eq!(cfg.balancetes.archive_suffix, ".zip");
        assert!(!cfg.ifdata.flush_each_period);
        assert_eq!(cfg.ifdata.http.timeout_secs, 5);
        assert_eq!(cfg.ifdata.http.max_retries, 2);
        assert_eq!(cfg.log.file, Some(PathBuf::from("IFDATA_LOG.txt")));
        assert_eq!(cfg.manifest.base, "Balancetes/");
    }

    #[test]
    fn test_bad_period_is_rejected() {
        assert!(Config::from_yaml("balancetes:\n  start: \"202413\"\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "manifest:\n  base: https://data.example.org/bal/").unwrap();
        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg.manifest.base, "https://data.example.org/bal/");
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join(DEFAULT_CONFIG_FILE);

        assert_eq!(locate(None, &local), None);
        fs::write(&local, "log:\n  filter: debug\n").unwrap();
        assert_eq!(locate(None, &local), Some(local.clone()));
        assert_eq!(
            locate(Some(OsString::from("/etc/other.yaml")), &local),
            Some(PathBuf::from("/etc/other.yaml"))
        );
    }
}
