//! Contact address extraction from notice text.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex")
});

/// Return the last email address in `text`, lowercased, or an empty string.
///
/// Notices put the contact address at the end, after any addresses quoted
/// in the body, so the last match is the one kept.
pub fn extract_email(text: &str) -> String {
    EMAIL_RE
        .find_iter(text)
        .last()
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default()
}
