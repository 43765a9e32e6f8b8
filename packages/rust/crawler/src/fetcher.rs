//! HTTP fetch capability for detail pages.
//!
//! [`PageFetcher`] is the seam the enricher depends on; [`HttpFetcher`] is
//! the pooled `reqwest` implementation used in production.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use tenderfeed_shared::{HttpConfig, Result, TenderFeedError};

/// Maximum number of redirects to follow for a detail page.
const MAX_REDIRECTS: usize = 5;

/// Largest detail page we are willing to read (5 MB).
const MAX_PAGE_SIZE: u64 = 5 * 1024 * 1024;

/// Status and body of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches a page body. Errors mean the request itself failed (DNS,
/// connect, timeout); a non-2xx answer is still a [`FetchResponse`].
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchResponse>> + Send;
}

/// `reqwest`-backed fetcher with a bounded per-request timeout.
///
/// The inner client pools connections, so one instance should serve a whole
/// run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from the `[http]` config section.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.detail_timeout_secs))
            .build()
            .map_err(|e| TenderFeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        debug!(%url, "fetching detail page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| TenderFeedError::Network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        if let Some(len) = response.content_length() {
            if len > MAX_PAGE_SIZE {
                return Err(too_large(url, len));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| TenderFeedError::Network(format!("{url}: body read failed: {e}")))?;

        // Chunked responses carry no length up front.
        if body.len() as u64 > MAX_PAGE_SIZE {
            return Err(too_large(url, body.len() as u64));
        }

        Ok(FetchResponse { status, body })
    }
}

fn too_large(url: &Url, len: u64) -> TenderFeedError {
    TenderFeedError::Network(format!(
        "{url}: page too large ({len} bytes, max {MAX_PAGE_SIZE})"
    ))
}
