//! Link discovery for fetched pages
//!
//! The coordinator hands every successful page to an [`Extractor`] and feeds
//! the URLs it returns back into the frontier. [`LinkExtractor`] is the
//! default: it follows `<a href>` and canonical links in HTML.

use crate::state::PageResult;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extraction collaborator: turns a fetched page into discovered links
///
/// Implementations may also process the content (store it, score it); the
/// coordinator only looks at the returned absolute URLs.
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &PageResult) -> Vec<String>;
}

/// Collects absolute HTTP(S) links from HTML pages
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
///
/// Relative links resolve against `<base href>` when present, otherwise
/// against the page's final URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkExtractor;

impl Extractor for LinkExtractor {
    fn extract(&self, page: &PageResult) -> Vec<String> {
        if !page.is_html() {
            return Vec::new();
        }
        let base = Url::parse(&page.final_url).unwrap_or_else(|_| page.url.clone());
        extract_links(&page.text(), &base)
    }
}

/// Extracts the unique links of an HTML document, in document order
///
/// # Example
///
/// ```
/// use ladder_crawl::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/page">Link</a><a href="mailto:me@example.com">Mail</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["https://example.com/page"]);
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, &base) {
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
