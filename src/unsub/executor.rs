//! Network execution of unsubscribe actions.
//!
//! Three operations, each reducing an HTTP exchange to an [`Outcome`]:
//! RFC 8058 one-click POST, GET-and-resolve (fetch a page, detect a
//! confirmation form, submit it), and the form submission itself. Redirects
//! are followed by the transport; relative form actions are resolved
//! against the fetched page's *final* URL, not the original request URL.
//!
//! Nothing here returns a Rust error: timeouts, connection failures, and
//! HTTP ≥ 400 all become `Error` outcomes so one dead endpoint never aborts
//! a run.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::HttpConfig;

use super::forms::{extract_forms, FormDescriptor};
use super::{Outcome, OutcomeStatus};

/// Fixed POST body mandated by RFC 8058.
pub const ONE_CLICK_BODY: &str = "List-Unsubscribe=One-Click";

/// Performs the concrete unsubscribe network operations.
pub struct ActionExecutor {
    http: reqwest::blocking::Client,
}

impl ActionExecutor {
    /// Build an executor with bounded timeouts and redirect following.
    pub fn new(config: &HttpConfig) -> crate::error::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http })
    }

    /// RFC 8058 one-click unsubscribe via POST.
    ///
    /// One-click endpoints are conventionally silent or redirect-only, so a
    /// 2xx/3xx without confirmation text is still `LikelySuccess`.
    pub fn one_click_post(&self, url: &str) -> Outcome {
        tracing::info!(url, "Attempting RFC 8058 one-click POST");

        let result = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(ONE_CLICK_BODY)
            .send();

        let response = match result {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "One-click response");
        if status.as_u16() >= 400 {
            return http_error(status);
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return transport_error(e),
        };

        if super::vocab::matches_success(&body) {
            Outcome::new(OutcomeStatus::Success, "Server confirmed unsubscribe")
        } else {
            Outcome::new(
                OutcomeStatus::LikelySuccess,
                format!("Server returned {} (one-click POST accepted)", status.as_u16()),
            )
        }
    }

    /// Try to unsubscribe by visiting a URL.
    ///
    /// If the fetched page already confirms the unsubscribe, done. Otherwise
    /// look for a confirmation form and submit it; with no form to submit,
    /// the page probably needs JavaScript or a human.
    pub fn get_and_resolve(&self, url: &str) -> Outcome {
        tracing::info!(url, "Fetching unsubscribe URL");

        let response = match self.http.get(url).send() {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };

        let status = response.status();
        let final_url = response.url().clone();
        if status.as_u16() >= 400 {
            return http_error(status);
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return transport_error(e),
        };
        tracing::debug!(
            status = status.as_u16(),
            bytes = body.len(),
            final_url = %final_url,
            "Fetched unsubscribe page"
        );

        // Check if just visiting the page was enough.
        if super::vocab::matches_success(&body) {
            return Outcome::new(OutcomeStatus::Success, "Page confirms unsubscribe");
        }

        // Look for a confirmation form to submit.
        let forms = extract_forms(&body);
        let mut candidates: Vec<&FormDescriptor> = forms
            .iter()
            .filter(|form| form.looks_like_confirmation())
            .collect();

        // If only one form is on the page, it's probably the confirmation.
        if candidates.is_empty() && forms.len() == 1 {
            candidates = forms.iter().collect();
        }

        match candidates.first() {
            Some(form) => self.submit_form(form, &final_url),
            None => Outcome::new(
                OutcomeStatus::Manual,
                "Page loaded but no confirmation detected; may need a browser",
            ),
        }
    }

    /// Submit a confirmation form.
    ///
    /// The action is resolved against `page_url` (the final URL of the page
    /// that produced the form); an empty or `#` action resubmits to the
    /// same URL.
    pub fn submit_form(&self, form: &FormDescriptor, page_url: &Url) -> Outcome {
        let action = form.action.trim();
        let target = if action.is_empty() || action == "#" {
            page_url.clone()
        } else {
            match page_url.join(action) {
                Ok(url) => url,
                Err(e) => {
                    return Outcome::new(
                        OutcomeStatus::Error,
                        format!("Invalid form action '{action}': {e}"),
                    )
                }
            }
        };

        tracing::info!(
            method = %form.method,
            target = %target,
            fields = form.inputs.len(),
            "Submitting confirmation form"
        );

        let request = if form.method == "POST" {
            self.http.post(target).form(&form.inputs)
        } else {
            self.http.get(target).query(&form.inputs)
        };

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => return transport_error(e),
        };

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Form response");
        if status.as_u16() >= 400 {
            return Outcome::new(
                OutcomeStatus::Error,
                format!("Form submission returned {}", status.as_u16()),
            );
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return transport_error(e),
        };
        if super::vocab::matches_success(&body) {
            Outcome::new(
                OutcomeStatus::Success,
                "Confirmed unsubscribe via form submission",
            )
        } else {
            Outcome::new(
                OutcomeStatus::LikelySuccess,
                format!("Form submitted, server returned {}", status.as_u16()),
            )
        }
    }
}

fn http_error(status: reqwest::StatusCode) -> Outcome {
    Outcome::new(
        OutcomeStatus::Error,
        format!("Server returned {}", status.as_u16()),
    )
}

fn transport_error(e: reqwest::Error) -> Outcome {
    Outcome::new(OutcomeStatus::Error, e.to_string())
}
