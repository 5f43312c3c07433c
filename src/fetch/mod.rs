//! Blocking HTTP fetch seam.
//!
//! All providers pull pages through the [`PageFetcher`] trait so tests can
//! substitute canned documents and count fetches. The production impl wraps
//! a blocking `reqwest` client; everything in this crate is sequential,
//! blocking I/O by design.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::errors::RemoteDataError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Blocking page fetch: GET a URL, hand back the body.
pub trait PageFetcher {
    /// Fetch the raw response body.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, RemoteDataError>;

    /// Fetch the response body as text.
    fn fetch(&self, url: &str) -> Result<String, RemoteDataError> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Production fetcher over a blocking `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, RemoteDataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, RemoteDataError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.bytes()?;
        if body.is_empty() {
            return Err(RemoteDataError::NoRootElement {
                url: url.to_string(),
            });
        }
        Ok(body.to_vec())
    }
}

/// Fetch a URL with a fixed-pause retry loop.
///
/// Sleeps `pause` before every attempt, swallows recoverable connectivity
/// errors between attempts and fails with [`RemoteDataError::RetriesExhausted`]
/// naming the source and URL once `retry_count` attempts are spent.
/// Non-recoverable errors surface immediately.
pub fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    retry_count: usize,
    pause: Duration,
    source_name: &str,
) -> Result<String, RemoteDataError> {
    for attempt in 0..retry_count {
        thread::sleep(pause);
        match fetcher.fetch(url) {
            Ok(body) => return Ok(body),
            Err(e) if e.is_recoverable() => {
                debug!(
                    "attempt {}/{} for {} failed: {}",
                    attempt + 1,
                    retry_count,
                    url,
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(RemoteDataError::RetriesExhausted {
        retries: retry_count,
        source_name: source_name.to_string(),
        url: url.to_string(),
    })
}
