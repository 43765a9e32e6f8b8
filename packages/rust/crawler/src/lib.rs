//! Detail-page fetching and scraping.
//!
//! This crate provides:
//! - [`PageFetcher`] / [`HttpFetcher`]: the HTTP fetch capability
//! - [`DetailDocument`]: HTML lookups by class, by text, and by sibling cell
//! - [`DetailPageEnricher`]: best-effort scraping of a tender's detail page

pub mod detail;
pub mod document;
pub mod fetcher;

pub use detail::{DetailFields, DetailPageEnricher, Enrichment, scrape_detail};
pub use document::{DetailDocument, descendant_text, element_text, next_sibling_text};
pub use fetcher::{FetchResponse, HttpFetcher, PageFetcher};
