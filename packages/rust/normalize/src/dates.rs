//! Multi-format date parsing.
//!
//! Listing rows and detail pages use several date layouts. [`DateParser`]
//! holds an ordered list of [`DateFormat`]s and returns the first match.
//! Order matters: a date-only layout would otherwise shadow its date-time
//! sibling, so the list runs from most to least specific.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Layout of the detail page's "Create Date" cell (`October 10, 2025`).
pub const CREATE_DATE_FORMAT: &str = "%B %d, %Y";

/// `14H00`, `9 h 30` → hour/minute marker between two numbers.
static HOUR_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[hH]\s*(\d{2})\b").expect("hour marker regex")
});

/// Whether a pattern carries a time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShape {
    /// Pattern yields a full date and time.
    DateTime,
    /// Pattern yields a date; the time is midnight.
    DateOnly,
}

/// One entry in a [`DateParser`]'s format list.
#[derive(Debug, Clone)]
pub struct DateFormat {
    /// `chrono` strftime pattern.
    pub pattern: Cow<'static, str>,
    pub shape: DateShape,
    /// Rewrites the input before matching (e.g. stripping literal markers).
    pub preprocess: Option<fn(&str) -> String>,
}

impl DateFormat {
    /// A pattern with both date and time fields.
    pub fn datetime(pattern: impl Into<Cow<'static, str>>) -> Self {
        Self {
            pattern: pattern.into(),
            shape: DateShape::DateTime,
            preprocess: None,
        }
    }

    /// A pattern with only date fields.
    pub fn date(pattern: impl Into<Cow<'static, str>>) -> Self {
        Self {
            pattern: pattern.into(),
            shape: DateShape::DateOnly,
            preprocess: None,
        }
    }

    /// Attach a preprocessing step applied before this pattern is tried.
    pub fn with_preprocess(mut self, preprocess: fn(&str) -> String) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    fn try_parse(&self, text: &str) -> Option<NaiveDateTime> {
        let prepared = match self.preprocess {
            Some(f) => Cow::Owned(f(text)),
            None => Cow::Borrowed(text),
        };
        let prepared = prepared.trim();

        match self.shape {
            DateShape::DateTime => NaiveDateTime::parse_from_str(prepared, &self.pattern).ok(),
            DateShape::DateOnly => NaiveDate::parse_from_str(prepared, &self.pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// Drop the period after the year and turn `14H00` into `14:00`.
///
/// `31 December 2025. 14H00` → `31 December 2025 14:00`.
pub fn strip_hour_marker(text: &str) -> String {
    let without_period = text.replace('.', "");
    HOUR_MARKER_RE
        .replace_all(&without_period, "$1:$2")
        .into_owned()
}

/// Tries an ordered list of formats; the first match wins.
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<DateFormat>,
}

impl DateParser {
    /// Parser with an explicit format list.
    pub fn new(formats: Vec<DateFormat>) -> Self {
        Self { formats }
    }

    /// Layouts seen in SANRAL listing rows.
    pub fn sanral() -> Self {
        Self::new(vec![
            DateFormat::datetime("%Y/%m/%d %H:%M"),
            DateFormat::date("%Y/%m/%d"),
            DateFormat::date("%d/%m/%Y"),
            DateFormat::datetime("%d %B %Y %H:%M").with_preprocess(strip_hour_marker),
        ])
    }

    /// Append a format, tried after every existing one.
    pub fn with_format(mut self, format: DateFormat) -> Self {
        self.formats.push(format);
        self
    }

    /// Formats in the order they are tried.
    pub fn formats(&self) -> &[DateFormat] {
        &self.formats
    }

    /// Parse `text`, returning `None` for empty or unrecognized input.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.formats.iter().find_map(|f| f.try_parse(trimmed))
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::sanral()
    }
}

/// Parse the detail page's "Create Date" cell.
pub fn parse_create_date(text: &str) -> Option<NaiveDateTime> {
    DateFormat::date(CREATE_DATE_FORMAT).try_parse(text.trim())
}
