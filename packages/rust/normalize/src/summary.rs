//! Listing-row parsing.
//!
//! The feed delivers each tender as a positional array:
//!
//! | index | content                          |
//! |-------|----------------------------------|
//! | 0     | `<a href="/path">NUMBER</a>`     |
//! | 1     | category                         |
//! | 2     | region                           |
//! | 3     | summary description              |
//! | 4     | full notice text                 |
//! | 5     | closing date                     |
//!
//! There are no field names to check against, so a row with fewer than
//! [`ROW_FIELD_COUNT`] entries is rejected rather than guessed at.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value;
use tracing::warn;
use url::Url;

use tenderfeed_shared::NOT_AVAILABLE;

use crate::dates::DateParser;
use crate::text::{collapse_whitespace, decode_entities, strip_tags, title_case};

/// Minimum number of positional fields in a listing row.
pub const ROW_FIELD_COUNT: usize = 6;

/// Boilerplate prefix on the summary description.
const NOTICE_PREFIX: &str = "Tender Notice:";

/// `<a ... href="target" ...>text</a>`
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*"([^"]*)"[^>]*>(.*?)</a\s*>"#).expect("link regex")
});

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// Why a feed entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowRejection {
    #[error("row is not a list (got {0})")]
    NotAList(&'static str),

    #[error("row has {0} fields, expected at least 6")]
    TooFewFields(usize),

    #[error("field {0} is not text")]
    NonTextField(usize),
}

/// One listing's positional fields, validated for shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<String>,
}

impl RawRow {
    /// Wrap already-textual fields.
    pub fn new(fields: Vec<String>) -> Result<Self, RowRejection> {
        if fields.len() < ROW_FIELD_COUNT {
            return Err(RowRejection::TooFewFields(fields.len()));
        }
        Ok(Self { fields })
    }

    /// Validate a feed entry.
    ///
    /// Strings are kept as-is, `null` becomes empty text, numbers and
    /// booleans use their JSON text. Nested arrays or objects in the first
    /// [`ROW_FIELD_COUNT`] positions reject the row.
    pub fn from_value(value: &Value) -> Result<Self, RowRejection> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(RowRejection::NotAList(json_kind(other))),
        };

        if items.len() < ROW_FIELD_COUNT {
            return Err(RowRejection::TooFewFields(items.len()));
        }

        let fields = items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Null => Ok(String::new()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                Value::Array(_) | Value::Object(_) if i < ROW_FIELD_COUNT => {
                    Err(RowRejection::NonTextField(i))
                }
                other => Ok(other.to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fields })
    }

    pub fn title_markup(&self) -> &str {
        &self.fields[0]
    }

    pub fn category(&self) -> &str {
        &self.fields[1]
    }

    pub fn region(&self) -> &str {
        &self.fields[2]
    }

    pub fn summary_description(&self) -> &str {
        &self.fields[3]
    }

    pub fn full_notice_text(&self) -> &str {
        &self.fields[4]
    }

    pub fn closing_date(&self) -> &str {
        &self.fields[5]
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// ProvisionalFields
// ---------------------------------------------------------------------------

/// Values taken from the listing row alone, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalFields {
    /// Starts out equal to the identifier.
    pub title: String,
    pub description: String,
    pub full_notice_text: String,
    /// Absolute detail-page URL; `None` means enrichment is skipped.
    pub url: Option<Url>,
    /// Link text of the title markup, or [`NOT_AVAILABLE`].
    pub tender_number: String,
    pub closing_date: Option<NaiveDateTime>,
    pub category: String,
    pub region: String,
}

// ---------------------------------------------------------------------------
// SummaryRowParser
// ---------------------------------------------------------------------------

/// Turns a [`RawRow`] into [`ProvisionalFields`].
#[derive(Debug, Clone)]
pub struct SummaryRowParser {
    origin: Url,
    dates: DateParser,
}

impl SummaryRowParser {
    /// Parser resolving detail links against `origin`.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            dates: DateParser::default(),
        }
    }

    /// Extract provisional fields. Never fails: every field has a fallback.
    pub fn parse(&self, row: &RawRow) -> ProvisionalFields {
        let title_html = decode_entities(row.title_markup());

        let (url, tender_number) = match LINK_RE.captures(&title_html) {
            Some(caps) => {
                let href = caps[1].trim();
                let link_text = collapse_whitespace(&strip_tags(&caps[2]));
                let url = if href.is_empty() {
                    None
                } else {
                    self.resolve(href)
                };
                (url, link_text)
            }
            None => (None, NOT_AVAILABLE.to_string()),
        };

        let description = strip_notice_prefix(&collapse_whitespace(&decode_entities(
            row.summary_description(),
        )));
        let full_notice_text = collapse_whitespace(&decode_entities(row.full_notice_text()));

        ProvisionalFields {
            title: tender_number.clone(),
            description,
            full_notice_text,
            url,
            tender_number,
            closing_date: self.dates.parse(row.closing_date()),
            category: title_case(row.category().trim()),
            region: title_case(row.region().trim()),
        }
    }

    /// Resolve `href` against the origin. Links leaving the portal host are
    /// dropped so enrichment only ever fetches portal pages.
    fn resolve(&self, href: &str) -> Option<Url> {
        let url = match self.origin.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!(href, error = %e, "could not resolve detail link, skipping enrichment");
                return None;
            }
        };

        let is_http = matches!(url.scheme(), "http" | "https");
        if !is_http || url.host_str() != self.origin.host_str() {
            warn!(%url, "detail link leaves the portal, skipping enrichment");
            return None;
        }

        Some(url)
    }
}

fn strip_notice_prefix(description: &str) -> String {
    description
        .strip_prefix(NOTICE_PREFIX)
        .unwrap_or(description)
        .trim()
        .to_string()
}
