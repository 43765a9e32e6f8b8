//! Client for the portal's open-tenders listing endpoint.
//!
//! The endpoint answers with a JSON object holding the rows of the current
//! page and the total number of open tenders:
//!
//! ```json
//! { "tenders": [["<a href=...>", "Category", ...], ...], "total_filtered": 42 }
//! ```
//!
//! Rows are returned untouched; shape validation happens per row downstream.
//! Any failure here is fatal for the run and is reported as a
//! [`TenderFeedError::Network`] or [`TenderFeedError::Feed`], never as an
//! empty listing.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use tenderfeed_shared::{HttpConfig, Result, TenderFeedError};

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// FeedPage
// ---------------------------------------------------------------------------

/// One page of the listing feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    /// Raw positional rows, in feed order.
    pub rows: Vec<Value>,
    /// Number of open tenders the portal reports in total.
    pub total_filtered: u64,
}

impl FeedPage {
    /// Whether the portal holds more rows than this page returned.
    pub fn is_truncated(&self) -> bool {
        (self.rows.len() as u64) < self.total_filtered
    }
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    tenders: Vec<Value>,
    #[serde(default)]
    total_filtered: u64,
}

// ---------------------------------------------------------------------------
// ListingFeed
// ---------------------------------------------------------------------------

/// Fetches the open-tenders listing.
#[derive(Debug, Clone)]
pub struct ListingFeed {
    client: Client,
    listing_url: Url,
}

impl ListingFeed {
    /// Build a feed client for `listing_url` using the `[http]` settings.
    pub fn new(listing_url: Url, config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .build()
            .map_err(|e| TenderFeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            listing_url,
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    /// Fetch and decode the listing.
    #[instrument(skip_all, fields(url = %self.listing_url))]
    pub async fn fetch(&self) -> Result<FeedPage> {
        let url = &self.listing_url;
        info!("fetching tender listing");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| TenderFeedError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TenderFeedError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(TenderFeedError::feed(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| TenderFeedError::Network(format!("{url}: failed to read body: {e}")))?;

        let page = parse_listing(&body)?;

        info!(
            rows = page.rows.len(),
            total_filtered = page.total_filtered,
            "fetched tender listing"
        );
        if page.is_truncated() {
            warn!(
                rows = page.rows.len(),
                total_filtered = page.total_filtered,
                "listing returned fewer rows than total_filtered; raise the page size"
            );
        }

        Ok(page)
    }
}

/// Decode a listing body.
pub fn parse_listing(body: &str) -> Result<FeedPage> {
    let response: ListingResponse = serde_json::from_str(body)
        .map_err(|e| TenderFeedError::feed(format!("invalid listing JSON: {e}")))?;

    Ok(FeedPage {
        rows: response.tenders,
        total_filtered: response.total_filtered,
    })
}
