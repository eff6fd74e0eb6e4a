//! Unsubscribe link extraction from email HTML.

use super::scanner::{HtmlEvent, HtmlScanner};
use super::vocab;

/// One anchor that looks like an unsubscribe link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Absolute HTTP(S) target.
    pub href: String,
    /// Trimmed visible anchor text.
    pub text: String,
}

/// Extract unsubscribe-intent links from raw HTML, in document order.
///
/// An anchor is emitted only when its href is absolute HTTP(S) *and* either
/// its visible text or the href itself matches the intent vocabulary.
/// Nested anchors are not supported: a second `<a>` before the closing tag
/// restarts capture.
pub fn extract_unsub_links(html: &str) -> Vec<LinkCandidate> {
    let mut links = Vec::new();
    let mut current_href: Option<String> = None;
    let mut current_text: Vec<String> = Vec::new();
    let mut in_anchor = false;

    for event in HtmlScanner::new(html) {
        match event {
            HtmlEvent::Start(tag) if tag.name == "a" => {
                in_anchor = true;
                current_text.clear();
                current_href = tag.attr("href").map(str::to_string);
            }
            HtmlEvent::Text(data) if in_anchor => {
                current_text.push(data.into_owned());
            }
            HtmlEvent::End(name) if name == "a" && in_anchor => {
                in_anchor = false;
                let text = current_text.join(" ").trim().to_string();
                if let Some(href) = current_href.take() {
                    let is_http =
                        href.starts_with("http://") || href.starts_with("https://");
                    if is_http && (vocab::matches_intent(&text) || vocab::matches_intent(&href)) {
                        links.push(LinkCandidate { href, text });
                    }
                }
                current_text.clear();
            }
            _ => {}
        }
    }
    links
}

/// Extract unsubscribe links across all HTML body parts of one message,
/// preserving part order then document order.
pub fn extract_from_parts<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<LinkCandidate> {
    let mut links = Vec::new();
    for html in parts {
        links.extend(extract_unsub_links(html));
    }
    links
}
