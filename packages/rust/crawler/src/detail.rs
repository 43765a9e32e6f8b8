//! Detail-page enrichment.
//!
//! Every listing links to a detail page carrying the authoritative title,
//! description, notice text and publication date. Scraping it is
//! best-effort: a failed fetch yields [`Enrichment::Unavailable`], and each
//! field lookup on a fetched page is independent of the others.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use tenderfeed_normalize::parse_create_date;

use crate::document::{DetailDocument, descendant_text, next_sibling_text};
use crate::fetcher::PageFetcher;

/// Label cell preceding the full notice text.
static NOTICE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*Tender Notice:\s*$").expect("notice label regex")
});

/// Header cell preceding the publication date.
static CREATE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Create Date\s*$").expect("create date regex"));

/// Fields scraped from a detail page. `None` means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub full_notice_text: Option<String>,
    pub published_date: Option<NaiveDateTime>,
}

/// Outcome of enriching one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// The page was fetched; individual fields may still be missing.
    Available(DetailFields),
    /// The page could not be fetched; keep the summary values.
    Unavailable { reason: String },
}

impl Enrichment {
    /// Scraped fields, or all-`None` when the page was unavailable.
    pub fn into_fields(self) -> DetailFields {
        match self {
            Self::Available(fields) => fields,
            Self::Unavailable { .. } => DetailFields::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Fetches and scrapes detail pages.
#[derive(Debug, Clone)]
pub struct DetailPageEnricher<F> {
    fetcher: F,
}

impl<F: PageFetcher> DetailPageEnricher<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetch `url` and scrape it. Never fails; problems are logged and
    /// reported as [`Enrichment::Unavailable`].
    #[instrument(skip_all, fields(url = %url))]
    pub async fn enrich(&self, url: &Url) -> Enrichment {
        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "could not fetch detail page, using summary data");
                return Enrichment::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        if !response.is_success() {
            warn!(
                status = response.status,
                "detail page returned non-success status, using summary data"
            );
            return Enrichment::Unavailable {
                reason: format!("HTTP {}", response.status),
            };
        }

        Enrichment::Available(scrape_detail(&response.body, url))
    }
}

/// Scrape the four detail fields out of a page body.
pub fn scrape_detail(body: &str, url: &Url) -> DetailFields {
    let doc = DetailDocument::parse(body);

    let title = doc
        .find_by_class("div", "page-header")
        .and_then(|header| descendant_text(&header, "h2"));

    let description = doc.first_text("h3");

    let full_notice_text = doc
        .find_by_text("td", &NOTICE_LABEL_RE)
        .and_then(|label| next_sibling_text(&label, "td"));

    let published_date = doc
        .find_by_text("th", &CREATE_DATE_RE)
        .and_then(|header| next_sibling_text(&header, "td"))
        .and_then(|raw| {
            let parsed = parse_create_date(&raw);
            if parsed.is_none() {
                warn!(%url, value = %raw, "could not parse published date");
            }
            parsed
        });

    debug!(
        %url,
        title = title.is_some(),
        description = description.is_some(),
        notice = full_notice_text.is_some(),
        published = published_date.is_some(),
        "scraped detail page"
    );

    DetailFields {
        title,
        description,
        full_notice_text,
        published_date,
    }
}
