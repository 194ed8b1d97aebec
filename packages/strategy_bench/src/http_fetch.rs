use std::time::Duration;

use tracing::{trace, warn};

use crate::error::WorkloadError;
use crate::{Workload, WorkloadKind, WorkloadSpec};

/// Per-request timeout used unless configured otherwise.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Public endpoints used by the stock I/O benchmark.
pub const SAMPLE_URLS: [&str; 4] = [
    "https://api.github.com/events",
    "https://api.github.com/emojis",
    "https://api.github.com/meta",
    "https://api.github.com/feeds",
];

const USER_AGENT: &str = concat!("strategy_bench/", env!("CARGO_PKG_VERSION"));

/// I/O-bound workload that downloads a URL and reports the size of the response body in bytes.
///
/// Each request is bounded by a timeout. Any failure (connection refused, timeout, truncated
/// body) is logged and the unit resolves to 0 bytes. Responses with an error status still count
/// their body, since the request itself completed.
///
/// The blocking path builds a fresh client per request. The cooperative path builds one per
/// task, so no connection outlives the event loop that created it.
#[derive(Clone, Debug)]
pub struct HttpFetch {
    timeout: Duration,
}

impl HttpFetch {
    /// Creates the workload with [`DEFAULT_HTTP_TIMEOUT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates the workload with a custom per-request timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The stock input set: [`SAMPLE_URLS`] repeated five times.
    #[must_use]
    pub fn default_inputs() -> Vec<String> {
        SAMPLE_URLS
            .iter()
            .cycle()
            .take(SAMPLE_URLS.len().saturating_mul(5))
            .map(|url| (*url).to_string())
            .collect()
    }

    fn fetch_blocking(&self, url: &str) -> Result<u64, WorkloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let body = client.get(url).send()?.bytes()?;

        Ok(byte_count(body.len()))
    }

    async fn fetch(&self, url: &str) -> Result<u64, WorkloadError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let body = client.get(url).send().await?.bytes().await?;

        Ok(byte_count(body.len()))
    }
}

impl Default for HttpFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl Workload for HttpFetch {
    type Input = String;
    type Output = u64;

    fn name(&self) -> &str {
        "http_fetch"
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Io
    }

    fn invoke(&self, input: &String) -> u64 {
        degrade(input, self.fetch_blocking(input))
    }

    async fn invoke_async(&self, input: &String) -> u64 {
        degrade(input, self.fetch(input).await)
    }

    fn unit(&self) -> &'static str {
        "bytes"
    }

    fn spec(&self) -> Option<WorkloadSpec> {
        Some(WorkloadSpec::HttpFetch {
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

fn degrade(url: &str, outcome: Result<u64, WorkloadError>) -> u64 {
    match outcome {
        Ok(bytes) => {
            trace!(url, bytes, "fetch completed");
            bytes
        }
        Err(error) => {
            warn!(url, %error, "fetch failed, recording 0 bytes");
            0
        }
    }
}

fn byte_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
