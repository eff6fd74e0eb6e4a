//! Unsubscribe vocabulary matchers.
//!
//! Two independent pattern tables, compiled once and applied only at a few
//! bounded points:
//!
//! - **intent**: does this text *relate to* unsubscribing? Applied to
//!   anchor text + href, and to form text + input values.
//! - **success**: does this text *confirm* an unsubscribe happened?
//!   Applied to response bodies after an action.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that suggest an unsubscribe link or form.
static INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)unsubscribe|opt[\s_-]?out|email[\s_-]?preferences",
        r"|manage[\s_-]?subscriptions?|remove[\s_-]?me|stop[\s_-]?receiving",
    ))
    .expect("intent vocabulary compiles")
});

/// Phrases that indicate success on a response page.
static SUCCESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)successfully\s+unsubscribed|you.ve been (removed|unsubscribed)",
        r"|unsubscribe[d]?\s+(successful|confirmed|complete)",
        r"|removed from.{0,30}(list|mailing)|no longer receive",
        r"|subscription.{0,20}(cancelled|canceled|removed)",
        r"|you.re unsubscribed|opt.out.{0,20}(confirmed|complete|successful)",
    ))
    .expect("success vocabulary compiles")
});

/// Does `text` look related to unsubscribing?
pub fn matches_intent(text: &str) -> bool {
    INTENT.is_match(text)
}

/// Does `text` confirm that an unsubscribe was carried out?
pub fn matches_success(text: &str) -> bool {
    SUCCESS.is_match(text)
}
