//! `List-Unsubscribe` header parsing (RFC 2369).

use once_cell::sync::Lazy;
use regex::Regex;

/// URIs are enclosed in angle brackets; everything else in the header
/// (comments, separators) is ignored.
static ANGLE_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>]+)>").expect("angle-bracket pattern compiles"));

/// The actionable URIs of one `List-Unsubscribe` header, partitioned by
/// scheme. Header order is preserved within each group; duplicates are
/// kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribeUris {
    /// `http://` and `https://` targets, actionable by the executor.
    pub http: Vec<String>,
    /// `mailto:` targets, reported for manual use only.
    pub mailto: Vec<String>,
}

impl UnsubscribeUris {
    /// True when the header yielded nothing actionable in either group.
    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.mailto.is_empty()
    }
}

/// Parse a raw `List-Unsubscribe` header value into its URI groups.
///
/// An absent header yields an empty result. Entries with a missing closing
/// bracket are simply not matched; URIs with other schemes are dropped.
pub fn parse_list_unsubscribe(header_value: Option<&str>) -> UnsubscribeUris {
    let mut uris = UnsubscribeUris::default();
    let Some(value) = header_value else {
        return uris;
    };

    for capture in ANGLE_URI.captures_iter(value) {
        let uri = capture[1].trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uris.http.push(uri.to_string());
        } else if uri.starts_with("mailto:") {
            uris.mailto.push(uri.to_string());
        }
    }
    uris
}
