//! Core domain types for canonical tender records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TenderFeedError};

/// Placeholder for identifiers that could not be resolved from a listing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Name of the supporting document that points back at the detail page.
pub const TENDER_DETAILS_DOC: &str = "Tender Details";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SupportingDocument
// ---------------------------------------------------------------------------

/// A document linked from a tender (currently only the detail page itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportingDocument {
    pub name: String,
    pub url: String,
}

impl SupportingDocument {
    /// The "Tender Details" entry pointing at a resolved detail page.
    pub fn tender_details(url: impl Into<String>) -> Self {
        Self {
            name: TENDER_DETAILS_DOC.to_string(),
            url: url.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CanonicalRecord
// ---------------------------------------------------------------------------

/// Anything that can be delivered downstream as a flat JSON mapping.
///
/// The SANRAL [`Tender`] is the only implementor today; records from other
/// portals implement the same capability with their own extra fields.
pub trait CanonicalRecord: Serialize {
    /// Fixed literal naming the originating portal.
    fn source(&self) -> &str;

    /// Serialize into the flat mapping the delivery boundary depends on.
    fn to_canonical_record(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(TenderFeedError::validation(format!(
                "canonical record must be a JSON object, got {other}"
            ))),
            Err(e) => Err(TenderFeedError::validation(format!(
                "failed to serialize canonical record: {e}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tender
// ---------------------------------------------------------------------------

/// Fields every tender carries regardless of the portal it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderCommon {
    pub title: String,
    pub description: String,
    /// Fixed literal identifying the originating portal.
    pub source: String,
    /// Only ever sourced from the detail page.
    #[serde(default)]
    pub published_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub closing_date: Option<NaiveDateTime>,
    #[serde(rename = "supporting_docs", default)]
    pub supporting_documents: Vec<SupportingDocument>,
    /// Reserved for downstream classification; always empty here.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Canonical SANRAL tender, as delivered to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    #[serde(flatten)]
    pub common: TenderCommon,
    /// Upper-cased identifier, or [`NOT_AVAILABLE`].
    pub tender_number: String,
    pub category: String,
    pub region: String,
    /// Empty, or a lowercase email address.
    pub email: String,
    pub full_notice_text: String,
}

impl CanonicalRecord for Tender {
    fn source(&self) -> &str {
        &self.common.source
    }
}
