//! Priority-ordered CSS selector helpers.
//!
//! Job boards reshuffle their markup often, so every field is looked up
//! through a list of selectors tried in order; the first hit wins.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

fn parse(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!(selector = css, error = %e, "skipping invalid selector");
            None
        }
    }
}

/// Collect listing elements using the first selector that matches anything.
///
/// Returns the winning selector alongside the matches.
pub fn select_listings<'a>(
    document: &'a Html,
    selectors: &[&'static str],
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        let elements: Vec<_> = document.select(&selector).collect();
        if elements.is_empty() {
            None
        } else {
            Some((*css, elements))
        }
    })
}

/// Cleaned text of the first matching descendant with non-empty text.
pub fn first_text(root: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        root.select(&selector)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    })
}

/// Attribute value of the first matching descendant carrying it.
pub fn first_attr(root: ElementRef<'_>, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = parse(css)?;
        root.select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(ToString::to_string)
    })
}

/// Collapse runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Resolve an href against the platform base URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok()
}

/// Remove the named query parameters, dropping the query when nothing is left.
pub fn strip_query_params(url: &mut Url, params: &[&str]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let key: &str = key;
            !params.contains(&key)
        })
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}
