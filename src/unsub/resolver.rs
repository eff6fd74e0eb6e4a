//! Strategy selection and orchestration.
//!
//! The resolver inspects one email's headers and HTML body, picks the best
//! available unsubscribe mechanism in a fixed priority order, runs it, and
//! reports the result. Exactly one strategy executes per invocation; a
//! failed or `Manual` attempt never falls back to a lower-priority one,
//! because the network side effects of the first attempt are not repeatable.
//!
//! Planning is pure (no I/O), so dry-run and tests can see exactly which
//! URL and method a real run would use.

use crate::error::Result;
use crate::jmap::{EmailRecord, JmapClient};

use super::executor::{ActionExecutor, ONE_CLICK_BODY};
use super::header::parse_list_unsubscribe;
use super::links::extract_from_parts;
use super::{Outcome, OutcomeStatus};

/// The mechanism selected for one message, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// RFC 8058: header URI plus the one-click marker in
    /// `List-Unsubscribe-Post`.
    OneClick { url: String },
    /// Plain `List-Unsubscribe` header URI, fetched and resolved.
    HeaderGet { url: String },
    /// Unsubscribe-looking link found in the HTML body.
    BodyLink { url: String, text: String },
    /// No actionable HTTP(S) mechanism; a mailto target may exist.
    Nothing { mailto: Option<String> },
}

impl Plan {
    /// Short name for logs and the transcript.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::OneClick { .. } => "one_click",
            Self::HeaderGet { .. } => "header_url",
            Self::BodyLink { .. } => "html_link",
            Self::Nothing { .. } => "none",
        }
    }

    /// The URL a non-dry run would act on, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::OneClick { url } | Self::HeaderGet { url } | Self::BodyLink { url, .. } => {
                Some(url)
            }
            Self::Nothing { .. } => None,
        }
    }
}

/// The terminal report of one resolution.
#[derive(Debug)]
pub struct Resolution {
    /// True iff the final outcome was `Success` or `LikelySuccess`
    /// (dry runs of actionable plans also count).
    pub succeeded: bool,
    /// The selected mechanism; `None` when no matching email was found.
    pub plan: Option<Plan>,
    /// The executed outcome; `None` for dry runs and non-actionable plans.
    pub outcome: Option<Outcome>,
    /// Human-readable account of what happened, one line per step.
    pub transcript: Vec<String>,
}

/// Select the unsubscribe mechanism for one message. Pure; performs no I/O.
///
/// Priority: one-click POST, then header URL, then HTML body link, then
/// nothing. Among body links, the first whose anchor text contains
/// "unsubscribe" wins, else the first in document order.
pub fn plan(record: &EmailRecord) -> Plan {
    let uris = parse_list_unsubscribe(record.list_unsubscribe.as_deref());

    if let Some(first) = uris.http.first() {
        let one_click = record
            .list_unsubscribe_post
            .as_deref()
            .is_some_and(|post| post.contains(ONE_CLICK_BODY));
        if one_click {
            return Plan::OneClick { url: first.clone() };
        }
        return Plan::HeaderGet { url: first.clone() };
    }

    let links = extract_from_parts(record.html_parts());
    if !links.is_empty() {
        let best = links
            .iter()
            .find(|link| link.text.to_lowercase().contains("unsubscribe"))
            .unwrap_or(&links[0]);
        return Plan::BodyLink {
            url: best.href.clone(),
            text: best.text.clone(),
        };
    }

    Plan::Nothing {
        mailto: uris.mailto.first().cloned(),
    }
}

/// Resolve one already-fetched message: select a strategy, execute it
/// (unless `dry_run`), and classify the result.
pub fn resolve_record(record: &EmailRecord, executor: &ActionExecutor, dry_run: bool) -> Resolution {
    let mut transcript = Vec::new();

    let date = record
        .received_at
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "?".to_string());
    transcript.push(format!(
        "Found: \"{}\" ({date})",
        record.subject_or_placeholder()
    ));

    let selected = plan(record);
    tracing::info!(strategy = selected.strategy_name(), "Selected strategy");

    let (succeeded, outcome) = match &selected {
        Plan::OneClick { url } => {
            transcript.push("Method: RFC 8058 one-click unsubscribe (best)".to_string());
            if dry_run {
                transcript.push(format!("[DRY RUN] Would POST to: {url}"));
                (true, None)
            } else {
                let outcome = executor.one_click_post(url);
                transcript.push(format!("Result: {outcome}"));
                (outcome.succeeded(), Some(outcome))
            }
        }
        Plan::HeaderGet { url } => {
            transcript.push("Method: List-Unsubscribe header URL".to_string());
            run_get(executor, url, dry_run, &mut transcript)
        }
        Plan::BodyLink { url, text } => {
            transcript.push(format!("Method: HTML body link (\"{text}\")"));
            run_get(executor, url, dry_run, &mut transcript)
        }
        Plan::Nothing { mailto } => {
            match mailto {
                Some(addr) => {
                    transcript.push(format!("No HTTP unsubscribe found. Mailto only: {addr}"));
                }
                None => {
                    transcript
                        .push("No unsubscribe link found in headers or body.".to_string());
                }
            }
            (false, None)
        }
    };

    Resolution {
        succeeded,
        plan: Some(selected),
        outcome,
        transcript,
    }
}

/// Shared GET-and-resolve path for the header-URL and body-link strategies.
fn run_get(
    executor: &ActionExecutor,
    url: &str,
    dry_run: bool,
    transcript: &mut Vec<String>,
) -> (bool, Option<Outcome>) {
    if dry_run {
        transcript.push(format!("[DRY RUN] Would visit: {url}"));
        return (true, None);
    }
    let outcome = executor.get_and_resolve(url);
    transcript.push(format!("Result: {outcome}"));
    if outcome.status == OutcomeStatus::Manual {
        transcript.push(format!("Open manually: {url}"));
    }
    (outcome.succeeded(), Some(outcome))
}

/// Ties the engine to the mail account: looks up a representative message
/// for a sender, then resolves it.
pub struct Resolver<'a> {
    client: &'a JmapClient,
    executor: &'a ActionExecutor,
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a JmapClient, executor: &'a ActionExecutor) -> Self {
        Self { client, executor }
    }

    /// Find the most recent message from `sender` (optionally addressed to
    /// `recipient`) and resolve its unsubscribe mechanism.
    ///
    /// Finding no message is an unsuccessful resolution, not an error; only
    /// account-API failures surface as `Err`.
    pub fn resolve(
        &self,
        sender: &str,
        recipient: Option<&str>,
        dry_run: bool,
    ) -> Result<Resolution> {
        let mut transcript = vec![match recipient {
            Some(to) => format!("Looking for email from: {sender} to: {to}"),
            None => format!("Looking for email from: {sender}"),
        }];

        let Some(record) = self.client.fetch_sample_email(sender, recipient)? else {
            tracing::warn!(sender, "No matching emails");
            transcript.push(format!("No emails found from {sender}"));
            return Ok(Resolution {
                succeeded: false,
                plan: None,
                outcome: None,
                transcript,
            });
        };

        let mut resolution = resolve_record(&record, self.executor, dry_run);
        transcript.append(&mut resolution.transcript);
        resolution.transcript = transcript;
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jmap::EmailRecord;
    use serde_json::json;

    fn record(value: serde_json::Value) -> EmailRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plan_one_click_needs_marker() {
        let rec = record(json!({
            "header:list-unsubscribe": "<https://ex.com/u/123>",
            "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
        }));
        assert_eq!(
            plan(&rec),
            Plan::OneClick {
                url: "https://ex.com/u/123".to_string()
            }
        );
    }

    #[test]
    fn test_plan_header_get_without_marker() {
        let rec = record(json!({
            "header:list-unsubscribe": "<https://ex.com/u/123>",
        }));
        assert_eq!(
            plan(&rec),
            Plan::HeaderGet {
                url: "https://ex.com/u/123".to_string()
            }
        );
    }

    #[test]
    fn test_plan_post_header_without_http_uri_is_not_one_click() {
        // The marker alone is useless without an HTTP URI to POST to.
        let rec = record(json!({
            "header:list-unsubscribe": "<mailto:u@ex.com>",
            "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
        }));
        assert_eq!(
            plan(&rec),
            Plan::Nothing {
                mailto: Some("mailto:u@ex.com".to_string())
            }
        );
    }

    #[test]
    fn test_plan_body_link_fallback() {
        let rec = record(json!({
            "htmlBody": [{"partId": "1"}],
            "bodyValues": {"1": {"value":
                "<a href=\"https://list.example/out?id=9\">Unsubscribe</a>"}},
        }));
        assert_eq!(
            plan(&rec),
            Plan::BodyLink {
                url: "https://list.example/out?id=9".to_string(),
                text: "Unsubscribe".to_string(),
            }
        );
    }

    #[test]
    fn test_plan_prefers_unsubscribe_anchor_text() {
        let rec = record(json!({
            "htmlBody": [{"partId": "1"}],
            "bodyValues": {"1": {"value": "\
                <a href=\"https://a.example/prefs\">Email preferences</a>\
                <a href=\"https://b.example/u\">Unsubscribe here</a>"}},
        }));
        assert_eq!(
            plan(&rec).url(),
            Some("https://b.example/u"),
            "anchor text containing 'unsubscribe' wins over document order"
        );
    }

    #[test]
    fn test_plan_header_beats_body_link() {
        let rec = record(json!({
            "header:list-unsubscribe": "<https://hdr.example/u>",
            "htmlBody": [{"partId": "1"}],
            "bodyValues": {"1": {"value":
                "<a href=\"https://body.example/u\">Unsubscribe</a>"}},
        }));
        assert_eq!(plan(&rec).strategy_name(), "header_url");
        assert_eq!(plan(&rec).url(), Some("https://hdr.example/u"));
    }

    #[test]
    fn test_plan_nothing_without_mailto() {
        let rec = record(json!({}));
        assert_eq!(plan(&rec), Plan::Nothing { mailto: None });
    }

    #[test]
    fn test_dry_run_skips_network_and_reports_plan() {
        let rec = record(json!({
            "subject": "Deals!",
            "header:list-unsubscribe": "<https://ex.com/u/123>",
            "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
        }));
        // The executor is never used on a dry run; point it at nothing.
        let executor = ActionExecutor::new(&crate::config::HttpConfig::default()).unwrap();
        let resolution = resolve_record(&rec, &executor, true);

        assert!(resolution.succeeded);
        assert!(resolution.outcome.is_none());
        assert_eq!(
            resolution.plan.as_ref().map(|p| p.strategy_name()),
            Some("one_click")
        );
        assert!(resolution
            .transcript
            .iter()
            .any(|line| line.contains("[DRY RUN] Would POST to: https://ex.com/u/123")));
    }

    #[test]
    fn test_nothing_plan_reports_mailto() {
        let rec = record(json!({
            "header:list-unsubscribe": "<mailto:list@example.com>",
        }));
        let executor = ActionExecutor::new(&crate::config::HttpConfig::default()).unwrap();
        let resolution = resolve_record(&rec, &executor, false);

        assert!(!resolution.succeeded);
        assert!(resolution.outcome.is_none());
        assert!(resolution
            .transcript
            .iter()
            .any(|line| line.contains("Mailto only: mailto:list@example.com")));
    }
}
