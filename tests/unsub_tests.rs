//! End-to-end tests for the unsubscribe engine against a mock HTTP server.
//!
//! The engine is synchronous (blocking reqwest), so every resolution runs
//! inside `spawn_blocking` while wiremock serves from the async side.

use mailsweep::config::HttpConfig;
use mailsweep::jmap::EmailRecord;
use mailsweep::unsub::resolver::{resolve_record, Resolution};
use mailsweep::unsub::{ActionExecutor, OutcomeStatus};

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(value: serde_json::Value) -> EmailRecord {
    serde_json::from_value(value).unwrap()
}

async fn resolve(rec: EmailRecord) -> Resolution {
    tokio::task::spawn_blocking(move || {
        let executor = ActionExecutor::new(&HttpConfig::default()).unwrap();
        resolve_record(&rec, &executor, false)
    })
    .await
    .unwrap()
}

async fn resolve_dry(rec: EmailRecord) -> Resolution {
    tokio::task::spawn_blocking(move || {
        let executor = ActionExecutor::new(&HttpConfig::default()).unwrap();
        resolve_record(&rec, &executor, true)
    })
    .await
    .unwrap()
}

// ─── Scenario A: RFC 8058 one-click ─────────────────────────────────

#[tokio::test]
async fn one_click_post_is_likely_success_without_confirmation_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/u/123"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("List-Unsubscribe=One-Click"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let rec = record(json!({
        "subject": "Deals!",
        "header:list-unsubscribe": format!("<{}/u/123>", server.uri()),
        "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
    }));
    let resolution = resolve(rec).await;

    assert!(resolution.succeeded);
    assert_eq!(
        resolution.plan.as_ref().unwrap().strategy_name(),
        "one_click"
    );
    let outcome = resolution.outcome.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::LikelySuccess);
    assert!(outcome.message.contains("200"));
}

#[tokio::test]
async fn one_click_post_with_confirmation_text_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/u/9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("You have successfully unsubscribed from this list."),
        )
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u/9>", server.uri()),
        "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
    }));
    let resolution = resolve(rec).await;
    assert_eq!(resolution.outcome.unwrap().status, OutcomeStatus::Success);
}

#[tokio::test]
async fn one_click_http_error_is_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/u/dead"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u/dead>", server.uri()),
        "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
    }));
    let resolution = resolve(rec).await;

    assert!(!resolution.succeeded);
    let outcome = resolution.outcome.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome.message.contains("410"));
}

// ─── Header URL strategy ────────────────────────────────────────────

#[tokio::test]
async fn header_url_page_confirming_directly_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<p>You're unsubscribed.</p>"),
        )
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u>", server.uri()),
    }));
    let resolution = resolve(rec).await;

    assert_eq!(
        resolution.plan.as_ref().unwrap().strategy_name(),
        "header_url"
    );
    let outcome = resolution.outcome.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.message, "Page confirms unsubscribe");
}

#[tokio::test]
async fn header_url_page_without_form_is_manual() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><p>Please log in to manage your account.</p>\
             <script>app.start()</script></body></html>",
        ))
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u>", server.uri()),
    }));
    let resolution = resolve(rec).await;

    assert!(!resolution.succeeded);
    assert_eq!(resolution.outcome.unwrap().status, OutcomeStatus::Manual);
    assert!(resolution
        .transcript
        .iter()
        .any(|line| line.starts_with("Open manually: ")));
}

#[tokio::test]
async fn confirmation_form_selected_by_intent_and_submitted_via_get() {
    let server = MockServer::start().await;
    // Empty action resubmits to the same URL, inputs as query params.
    // Mounted first so it takes precedence over the bare-path mock below.
    Mock::given(method("GET"))
        .and(path("/prefs"))
        .and(query_param("u", "8841"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Your subscription has been cancelled."),
        )
        .mount(&server)
        .await;
    // Two forms; only the second matches the intent vocabulary.
    Mock::given(method("GET"))
        .and(path("/prefs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form action="/search"><input name="q"></form>
               <form action="" method="get">
                 Click below to stop receiving our emails
                 <input name="u" value="8841">
               </form>"#,
        ))
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/prefs>", server.uri()),
    }));
    let resolution = resolve(rec).await;

    let outcome = resolution.outcome.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.message, "Confirmed unsubscribe via form submission");
}

#[tokio::test]
async fn form_action_resolves_against_redirected_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/pages/landing"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form action="submit" method="POST">
                 Confirm unsubscribe
                 <input name="token" value="t1">
               </form>"#,
        ))
        .mount(&server)
        .await;
    // "submit" is relative to the *final* URL, i.e. /pages/submit.
    Mock::given(method("POST"))
        .and(path("/pages/submit"))
        .and(body_string("token=t1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .expect(1)
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/start>", server.uri()),
    }));
    let resolution = resolve(rec).await;

    let outcome = resolution.outcome.unwrap();
    // Form accepted without explicit confirmation text.
    assert_eq!(outcome.status, OutcomeStatus::LikelySuccess);
    assert!(resolution.succeeded);
}

#[tokio::test]
async fn form_submission_http_error_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form action="/confirm" method="POST">confirm<input name="t" value="1"></form>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/confirm"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u>", server.uri()),
    }));
    let resolution = resolve(rec).await;

    let outcome = resolution.outcome.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome.message.contains("400"));
}

// ─── Scenario B: HTML body link with single-form heuristic ──────────

#[tokio::test]
async fn body_link_single_form_heuristic_end_to_end() {
    let server = MockServer::start().await;
    // One form, no intent words anywhere: the single-form heuristic applies.
    Mock::given(method("GET"))
        .and(path("/out"))
        .and(query_param("id", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><form action="/confirm2" method="POST">
                 <input name="token" value="abc">
               </form></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/confirm2"))
        .and(body_string("token=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("you've been removed"))
        .expect(1)
        .mount(&server)
        .await;

    let rec = record(json!({
        "htmlBody": [{"partId": "1"}],
        "bodyValues": {"1": {"value": format!(
            "<a href=\"{}/out?id=9\">Unsubscribe</a>", server.uri()
        )}},
    }));
    let resolution = resolve(rec).await;

    assert!(resolution.succeeded);
    assert_eq!(
        resolution.plan.as_ref().unwrap().strategy_name(),
        "html_link"
    );
    assert_eq!(resolution.outcome.unwrap().status, OutcomeStatus::Success);
}

// ─── Scenario C: nothing actionable ─────────────────────────────────

#[tokio::test]
async fn mailto_only_is_reported_and_fails() {
    let rec = record(json!({
        "header:list-unsubscribe": "<mailto:list@example.com>",
    }));
    let resolution = resolve(rec).await;

    assert!(!resolution.succeeded);
    assert_eq!(resolution.plan.as_ref().unwrap().strategy_name(), "none");
    assert!(resolution.outcome.is_none());
    assert!(resolution
        .transcript
        .iter()
        .any(|line| line.contains("Mailto only: mailto:list@example.com")));
}

// ─── Transport failures ─────────────────────────────────────────────

#[test]
fn form_body_read_failure_is_error() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use mailsweep::unsub::FormDescriptor;
    use url::Url;

    // Headers arrive, then the connection drops mid-chunk: send() succeeds
    // with a 200, reading the body fails.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        let _ = stream
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel");
    });

    let executor = ActionExecutor::new(&HttpConfig::default()).unwrap();
    let form = FormDescriptor {
        action: String::new(),
        method: "GET".to_string(),
        inputs: Vec::new(),
        text: String::new(),
    };
    let page_url = Url::parse(&format!("http://{addr}/confirm")).unwrap();
    let outcome = executor.submit_form(&form, &page_url);
    server.join().unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Error);
}

#[tokio::test]
async fn connection_failure_is_error_outcome_not_panic() {
    // Nothing listens on port 9; connection errors must fold into Outcome.
    let rec = record(json!({
        "header:list-unsubscribe": "<http://127.0.0.1:9/u>",
    }));
    let resolution = resolve(rec).await;

    assert!(!resolution.succeeded);
    assert_eq!(resolution.outcome.unwrap().status, OutcomeStatus::Error);
}

// ─── Dry run ────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_performs_no_network_actions() {
    let server = MockServer::start().await;
    // Deliberately no mounted mocks: any request would 404 and, more to
    // the point, show up in received_requests.
    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u/42>", server.uri()),
        "header:list-unsubscribe-post": "List-Unsubscribe=One-Click",
    }));
    let resolution = resolve_dry(rec).await;

    assert!(resolution.succeeded);
    assert_eq!(
        resolution.plan.as_ref().unwrap().strategy_name(),
        "one_click"
    );
    assert!(resolution.outcome.is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "dry run must not touch the network");
}

#[tokio::test]
async fn dry_run_selects_same_url_as_real_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u"))
        .respond_with(ResponseTemplate::new(200).set_body_string("no longer receive"))
        .mount(&server)
        .await;

    let rec = record(json!({
        "header:list-unsubscribe": format!("<{}/u>", server.uri()),
    }));

    let dry = resolve_dry(rec.clone()).await;
    let wet = resolve(rec).await;
    assert_eq!(
        dry.plan.as_ref().unwrap().url(),
        wet.plan.as_ref().unwrap().url()
    );
    assert_eq!(
        dry.plan.as_ref().unwrap().strategy_name(),
        wet.plan.as_ref().unwrap().strategy_name()
    );
}
