//! JMAP session negotiation.

use serde::Deserialize;

use crate::error::{Result, SweepError};

/// A negotiated JMAP session: where to send method calls, and for which
/// account.
#[derive(Debug, Clone)]
pub struct Session {
    /// The API endpoint for method calls.
    pub api_url: String,
    /// The first account id advertised by the server.
    pub account_id: String,
}

#[derive(Deserialize)]
struct RawSession {
    #[serde(rename = "apiUrl")]
    api_url: String,
    accounts: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// Fetch the session resource and extract `apiUrl` plus the first
    /// account id.
    pub fn negotiate(
        http: &reqwest::blocking::Client,
        session_url: &str,
        token: &str,
    ) -> Result<Session> {
        let response = http
            .get(session_url)
            .bearer_auth(token)
            .send()?
            .error_for_status()?;

        let raw: RawSession = response
            .json()
            .map_err(|e| SweepError::Session(format!("invalid session document: {e}")))?;

        let account_id = raw
            .accounts
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| SweepError::Session("no accounts in session".to_string()))?;

        tracing::debug!(api_url = %raw.api_url, account_id = %account_id, "Negotiated JMAP session");

        Ok(Session {
            api_url: raw.api_url,
            account_id,
        })
    }
}
