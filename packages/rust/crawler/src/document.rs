//! Queryable view over a parsed detail page.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use tenderfeed_normalize::text::collapse_whitespace;

/// A parsed HTML document with the handful of lookups detail scraping needs.
pub struct DetailDocument {
    html: Html,
}

impl DetailDocument {
    /// Parse a raw HTML body. Parsing never fails; malformed markup is
    /// repaired the way browsers do.
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
        }
    }

    /// First element matching a CSS selector.
    pub fn select_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(selector).ok()?;
        self.html.select(&sel).next()
    }

    /// First `<tag class="class">` element.
    pub fn find_by_class(&self, tag: &str, class: &str) -> Option<ElementRef<'_>> {
        self.select_first(&format!("{tag}.{class}"))
    }

    /// First `<tag>` whose whitespace-collapsed text matches `pattern`.
    pub fn find_by_text(&self, tag: &str, pattern: &Regex) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(tag).ok()?;
        self.html
            .select(&sel)
            .find(|el| pattern.is_match(&element_text(el)))
    }

    /// Non-empty text of the first element matching `selector`.
    pub fn first_text(&self, selector: &str) -> Option<String> {
        self.select_first(selector)
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
    }
}

/// Text of an element with whitespace collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Non-empty text of the first descendant of `el` matching `selector`.
pub fn descendant_text(el: &ElementRef<'_>, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    el.select(&sel)
        .next()
        .map(|child| element_text(&child))
        .filter(|text| !text.is_empty())
}

/// Non-empty text of the next sibling element named `tag`.
pub fn next_sibling_text(el: &ElementRef<'_>, tag: &str) -> Option<String> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == tag)
        .map(|sibling| element_text(&sibling))
        .filter(|text| !text.is_empty())
}
