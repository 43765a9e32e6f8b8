//! Small text helpers shared by the row parser and the detail scraper.

use std::sync::LazyLock;

use regex::Regex;

/// Matches any markup tag.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Decode HTML character references in a single pass.
///
/// Covers the full HTML5 named set, numeric references, and the legacy
/// names browsers accept without a trailing `;`. Decoding is not repeated,
/// so `&amp;lt;` becomes `&lt;` rather than `<`.
pub fn decode_entities(s: &str) -> String {
    htmlize::unescape(s).into_owned()
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup tags, keeping their text content.
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, " ").into_owned()
}

/// Title-case: the first letter of every run of letters is upper-cased and
/// the rest of the run lower-cased. Digits and punctuation break runs.
///
/// `KwaZulu-Natal` → `Kwazulu-Natal`, `RFP123/2025` → `Rfp123/2025`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
