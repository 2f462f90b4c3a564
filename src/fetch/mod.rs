// src/fetch/mod.rs

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::{future::Future, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::HttpConfig;

/// Raw answer to one GET. Non-success statuses are data, not errors.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to obtain any response at all.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("reading body from {url} failed: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// The transport seam used by the sync loop.
pub trait Fetcher {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<FetchResponse, FetchError>>;
}

/// reqwest-backed fetcher with retry on transport failures.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl HttpFetcher {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(http.timeout())
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            max_retries: http.max_retries,
            initial_backoff_ms: http.initial_backoff_ms,
        })
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status().as_u16();

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
            body.extend_from_slice(&chunk);
        }
        debug!(%url, status, bytes = body.len(), "response complete");

        Ok(FetchResponse { status, body })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let mut attempts = 0;
        loop {
            match self.fetch_once(url, timeout).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = backoff_delay(self.initial_backoff_ms, attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff.as_millis() as u64, error = %e, "retrying");
                    sleep(backoff).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "exhausted retries");
                    return Err(e);
                }
            }
        }
    }
}

/// Upper bound on a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// `initial_ms * 2^(attempt-1)`, capped at `MAX_BACKOFF`.
fn backoff_delay(initial_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(initial_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// Fill `{period}` and `{year}` placeholders of a URL template.
pub fn render_template(template: &str, period: crate::period::Period) -> String {
    template
        .replace("{period}", &period.to_string())
        .replace("{year}", &format!("{:04}", period.year()))
}

/// Last path segment of `url`, ignoring any query string.
pub fn remote_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    #[test]
    fn test_render_template() {
        let period: Period = "202412".parse().unwrap();
        assert_eq!(
            render_template("https://x.test/{year}/{period}SOCIEDADES.csv.zip", period),
            "https://x.test/2024/202412SOCIEDADES.csv.zip"
        );
        assert_eq!(render_template("?@AnoMes={period}&$format=json", period), "?@AnoMes=202412&$format=json");
    }

    #[test]
    fn test_remote_file_name() {
        assert_eq!(
            remote_file_name("https://www.bcb.gov.br/content/cosif/Sociedades/202412SOCIEDADES.csv.zip")
                .as_deref(),
            Some("202412SOCIEDADES.csv.zip")
        );
        assert_eq!(remote_file_name("https://x.test/dir/"), None);
        assert_eq!(remote_file_name("not a url"), None);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(500, 80), MAX_BACKOFF);
        assert_eq!(backoff_delay(u64::MAX, 2), MAX_BACKOFF);
    }

    #[test]
    fn test_success_range() {
        let ok = FetchResponse { status: 200, body: vec![] };
        let missing = FetchResponse { status: 404, body: vec![] };
        assert!(ok.is_success());
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let http = HttpConfig {
            max_retries: 0,
            ..HttpConfig::default()
        };
        let fetcher = HttpFetcher::new(&http).unwrap();
        // port 9 on localhost is the discard port and is normally closed
        let res = fetcher
            .fetch("http://127.0.0.1:9/nothing", Duration::from_secs(2))
            .await;
        assert!(res.is_err());
    }
}
