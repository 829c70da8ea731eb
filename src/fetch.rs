//! HTTP page fetching with per-request timeouts.
//!
//! Every network read in the crate goes through [`PageFetcher`]. Failures
//! come back as a [`FetchFailure`] value rather than bubbling up, so a single
//! bad URL never aborts a batch. [`HttpFetcher`] owns the one connection pool
//! used for a whole source run; dropping it releases the pool.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Extra request headers as `(name, value)` pairs.
pub type Headers = &'static [(&'static str, &'static str)];

/// No extra headers.
pub const NO_HEADERS: Headers = &[];

/// Browser-like headers for sites that reject obvious bots.
pub const BROWSER_HEADERS: Headers = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
];

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Why a fetch produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to read body: {0}")]
    Body(String),
}

/// Source of page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` with `headers`, returning the body on a 2xx response.
    async fn fetch(&self, url: &str, headers: Headers) -> Result<String, FetchFailure>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client whose requests all time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paper_tunneling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, headers: Headers) -> Result<String, FetchFailure> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            let failure = classify(&e);
            debug!(%url, reason = %failure, "Request failed");
            failure
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "Non-success status");
            return Err(FetchFailure::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            let failure = if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Body(e.to_string())
            };
            debug!(%url, reason = %failure, "Body read failed");
            failure
        })
    }
}

fn classify(e: &reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Transport(e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-memory fetcher for exercising sources without a network.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct StubFetcher {
        pages: HashMap<String, Result<String, FetchFailure>>,
        sequences: Mutex<HashMap<String, VecDeque<String>>>,
        requests: Mutex<Vec<(String, usize)>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn failing(mut self, url: &str, failure: FetchFailure) -> Self {
            self.pages.insert(url.to_string(), Err(failure));
            self
        }

        /// Serve `bodies` in order for `url`; the last one repeats.
        pub fn sequence(self, url: &str, bodies: &[&str]) -> Self {
            self.sequences.lock().unwrap().insert(
                url.to_string(),
                bodies.iter().map(|b| b.to_string()).collect(),
            );
            self
        }

        /// URLs requested so far, with the number of headers sent along.
        pub fn requests(&self) -> Vec<(String, usize)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, headers: Headers) -> Result<String, FetchFailure> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers.len()));
            tokio::task::yield_now().await;
            if let Some(queue) = self.sequences.lock().unwrap().get_mut(url) {
                let body = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                if let Some(body) = body {
                    return Ok(body);
                }
            }
            self.pages
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchFailure::Status(404)))
        }
    }
}
