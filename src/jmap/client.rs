//! Blocking JMAP client: batched `Email/query` + `Email/get` calls.
//!
//! Every fetch is a single round trip with two chained method calls, the
//! second back-referencing the first's result ids (`#ids`).

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::error::{Result, SweepError};

use super::session::Session;
use super::types::{AddressPair, EmailRecord, EmailSummary};

/// Capabilities requested with every method call.
const JMAP_USING: [&str; 2] = ["urn:ietf:params:jmap:core", "urn:ietf:params:jmap:mail"];

/// A connected, authenticated JMAP client.
pub struct JmapClient {
    http: reqwest::blocking::Client,
    token: String,
    config: ApiConfig,
    session: Session,
}

impl JmapClient {
    /// Negotiate a session and return a ready client.
    pub fn connect(config: &ApiConfig, token: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let session = Session::negotiate(&http, &config.session_url, token)?;
        Ok(Self {
            http,
            token: token.to_string(),
            config: config.clone(),
            session,
        })
    }

    /// Re-negotiate the session (used when the server starts answering
    /// 401/403 mid-run).
    pub fn refresh(&mut self) -> Result<()> {
        tracing::info!("Refreshing JMAP session");
        self.session = Session::negotiate(&self.http, &self.config.session_url, &self.token)?;
        Ok(())
    }

    /// POST a set of method calls and return the raw `methodResponses`.
    fn call(&self, method_calls: Value) -> Result<Value> {
        let body = json!({
            "using": JMAP_USING,
            "methodCalls": method_calls,
        });
        let response = self
            .http
            .post(&self.session.api_url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?
            .error_for_status()?;

        let mut parsed: Value = response.json()?;
        match parsed.get_mut("methodResponses") {
            Some(responses) => Ok(responses.take()),
            None => Err(SweepError::BadResponse(
                "missing methodResponses".to_string(),
            )),
        }
    }

    /// Extract the result object of the `index`-th method response,
    /// surfacing JMAP-level `error` responses.
    fn method_result(responses: &Value, index: usize) -> Result<&Value> {
        let entry = responses
            .get(index)
            .ok_or_else(|| SweepError::BadResponse(format!("missing method response {index}")))?;
        let name = entry.get(0).and_then(Value::as_str).unwrap_or("");
        let result = entry
            .get(1)
            .ok_or_else(|| SweepError::BadResponse(format!("malformed method response {index}")))?;
        if name == "error" {
            return Err(SweepError::JmapMethod {
                method: format!("call #{index}"),
                detail: result.to_string(),
            });
        }
        Ok(result)
    }

    /// The standard chained `Email/query` → `Email/get` pair.
    fn query_get(filter: Value, query_extra: Value, properties: Value, get_extra: Value) -> Value {
        let mut query = json!({
            "filter": filter,
            "sort": [{"property": "receivedAt", "isAscending": false}],
        });
        merge(&mut query, query_extra);

        let mut get = json!({
            "#ids": {
                "resultOf": "0",
                "name": "Email/query",
                "path": "/ids/*",
            },
            "properties": properties,
        });
        merge(&mut get, get_extra);

        json!([
            ["Email/query", query, "0"],
            ["Email/get", get, "1"],
        ])
    }

    /// Insert the account id into every method call object.
    fn with_account(&self, mut calls: Value) -> Value {
        if let Some(list) = calls.as_array_mut() {
            for call in list {
                if let Some(args) = call.get_mut(1).and_then(Value::as_object_mut) {
                    args.insert("accountId".to_string(), json!(self.session.account_id));
                }
            }
        }
        calls
    }

    /// Fetch the most recent message from `sender` (optionally constrained
    /// to messages addressed to `recipient`), with unsubscribe headers and
    /// decoded HTML body parts.
    pub fn fetch_sample_email(
        &self,
        sender: &str,
        recipient: Option<&str>,
    ) -> Result<Option<EmailRecord>> {
        let filter = match recipient {
            Some(to) => json!({
                "operator": "AND",
                "conditions": [{"from": sender}, {"to": to}],
            }),
            None => json!({"from": sender}),
        };

        let calls = Self::query_get(
            filter,
            json!({"limit": 1}),
            json!([
                "subject",
                "from",
                "receivedAt",
                "header:list-unsubscribe",
                "header:list-unsubscribe-post",
                "htmlBody",
                "bodyValues",
            ]),
            json!({
                "fetchHTMLBodyValues": true,
                "maxBodyValueBytes": self.config.max_body_bytes,
            }),
        );

        let responses = self.call(self.with_account(calls))?;
        let result = Self::method_result(&responses, 1)?;
        let list = result
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| SweepError::BadResponse("Email/get without list".to_string()))?;

        match list.first() {
            Some(email) => {
                let record: EmailRecord = serde_json::from_value(email.clone())
                    .map_err(|e| SweepError::BadResponse(format!("bad Email/get entry: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Fetch mailbox id → name.
    pub fn fetch_mailboxes(&self) -> Result<HashMap<String, String>> {
        let calls = self.with_account(json!([
            ["Mailbox/get", {"properties": ["id", "name"]}, "0"],
        ]));
        let responses = self.call(calls)?;
        let result = Self::method_result(&responses, 0)?;
        let list = result
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| SweepError::BadResponse("Mailbox/get without list".to_string()))?;

        let mut mailboxes = HashMap::new();
        for entry in list {
            let id = entry.get("id").and_then(Value::as_str);
            let name = entry.get("name").and_then(Value::as_str);
            if let (Some(id), Some(name)) = (id, name) {
                mailboxes.insert(id.to_string(), name.to_string());
            }
        }
        Ok(mailboxes)
    }

    /// Fetch up to `limit` most recent message summaries, optionally only
    /// those received after `after` (RFC 3339).
    pub fn fetch_summaries(&self, limit: usize, after: Option<&str>) -> Result<Vec<EmailSummary>> {
        let filter = match after {
            Some(ts) => json!({"after": ts}),
            None => json!({}),
        };
        let calls = Self::query_get(
            filter,
            json!({"limit": limit}),
            json!(["id", "subject", "from", "receivedAt", "size", "mailboxIds"]),
            json!({}),
        );

        let responses = self.call(self.with_account(calls))?;
        let result = Self::method_result(&responses, 1)?;
        let list = result
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| SweepError::BadResponse("Email/get without list".to_string()))?;

        let mut summaries = Vec::with_capacity(list.len());
        for entry in list {
            let summary: EmailSummary = serde_json::from_value(entry.clone())
                .map_err(|e| SweepError::BadResponse(format!("bad Email/get entry: {e}")))?;
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Fetch one page of `from`/`to` address pairs for the sender report.
    ///
    /// Returns the pairs and, when `calculate_total` was requested, the
    /// server's total match count.
    pub fn fetch_address_page(
        &self,
        after: &str,
        position: usize,
        calculate_total: bool,
    ) -> Result<(Vec<AddressPair>, Option<u64>)> {
        let mut query_extra = json!({
            "position": position,
            "limit": self.config.batch_size,
        });
        if calculate_total {
            merge(&mut query_extra, json!({"calculateTotal": true}));
        }

        let calls = Self::query_get(
            json!({"after": after}),
            query_extra,
            json!(["from", "to"]),
            json!({}),
        );

        let responses = self.call(self.with_account(calls))?;

        let query_result = Self::method_result(&responses, 0)?;
        let total = query_result.get("total").and_then(Value::as_u64);

        let get_result = Self::method_result(&responses, 1)?;
        let list = get_result
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| SweepError::BadResponse("Email/get without list".to_string()))?;

        let mut pairs = Vec::with_capacity(list.len());
        for entry in list {
            let pair: AddressPair = serde_json::from_value(entry.clone())
                .map_err(|e| SweepError::BadResponse(format!("bad Email/get entry: {e}")))?;
            pairs.push(pair);
        }
        Ok((pairs, total))
    }

    /// Page size used by [`fetch_address_page`](Self::fetch_address_page).
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }
}

/// Merge `extra`'s top-level keys into `target` (both must be objects).
fn merge(target: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_get_shape() {
        let calls = JmapClient::query_get(
            json!({"from": "a@b.com"}),
            json!({"limit": 1}),
            json!(["subject"]),
            json!({}),
        );
        let arr = calls.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0][0], "Email/query");
        assert_eq!(arr[0][1]["filter"]["from"], "a@b.com");
        assert_eq!(arr[0][1]["limit"], 1);
        assert_eq!(arr[1][0], "Email/get");
        assert_eq!(arr[1][1]["#ids"]["resultOf"], "0");
    }

    #[test]
    fn test_method_result_surfaces_errors() {
        let responses = json!([
            ["error", {"type": "unknownMethod"}, "0"],
        ]);
        let err = JmapClient::method_result(&responses, 0).unwrap_err();
        assert!(matches!(err, SweepError::JmapMethod { .. }));
        assert!(err.to_string().contains("unknownMethod"));
    }

    #[test]
    fn test_method_result_ok() {
        let responses = json!([
            ["Email/query", {"ids": ["m1"]}, "0"],
        ]);
        let result = JmapClient::method_result(&responses, 0).unwrap();
        assert_eq!(result["ids"][0], "m1");
    }

    #[test]
    fn test_merge_objects() {
        let mut target = json!({"a": 1});
        merge(&mut target, json!({"b": 2}));
        assert_eq!(target, json!({"a": 1, "b": 2}));
    }
}
