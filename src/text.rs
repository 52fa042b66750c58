//! Plain-text helpers for article summaries and site URLs.

use scraper::Html;
use url::Url;

pub const DEFAULT_SUMMARY_WORDS: usize = 50;

const FALLBACK_FAVICON: &str = "/favicon.svg";

/// Extract plain text from HTML content, treating every tag as a word boundary
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        if let Some(text_node) = node.value().as_text() {
            text.push_str(text_node);
            text.push(' ');
        }
    }

    // Collapse whitespace and trim
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip tags and keep the first `word_limit` words, appending an ellipsis
/// when anything was cut.
pub fn strip_html_and_truncate(html: &str, word_limit: usize) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = html_to_text(html);
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

    let mut summary = words
        .iter()
        .take(word_limit)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    if words.len() > word_limit {
        summary.push('…');
    }

    summary
}

/// Google favicon service URL for the site hosting `site_url`
pub fn favicon_url(site_url: &str) -> String {
    if site_url.is_empty() {
        return FALLBACK_FAVICON.to_string();
    }

    let parsed = match Url::parse(site_url) {
        Ok(parsed) => parsed,
        Err(_) => return FALLBACK_FAVICON.to_string(),
    };

    let host = match parsed.host_str() {
        Some(host) => host,
        None => return FALLBACK_FAVICON.to_string(),
    };

    format!(
        "https://t2.gstatic.com/faviconV2?client=SOCIAL&type=FAVICON&fallback_opts=TYPE,SIZE,URL&url={}://{}&size=128",
        parsed.scheme(),
        host
    )
}
