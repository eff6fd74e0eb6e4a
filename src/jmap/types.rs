//! Typed JMAP records.
//!
//! These deserialize directly from `Email/get` responses. JMAP header
//! properties use the `header:name` form, hence the unusual serde renames.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One mailbox participant (`from`/`to` entries).
#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    /// Display name, if the server provides one.
    #[serde(default)]
    pub name: Option<String>,
    /// Bare address (`user@domain`).
    #[serde(default)]
    pub email: Option<String>,
}

impl Address {
    /// The lowercased address, or `"unknown"` when absent.
    pub fn addr_lower(&self) -> String {
        self.email
            .as_deref()
            .unwrap_or("unknown")
            .to_ascii_lowercase()
    }
}

/// The `from`/`to` address lists of one message, as fetched for the
/// sender report.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressPair {
    #[serde(default)]
    pub from: Option<Vec<Address>>,
    #[serde(default)]
    pub to: Option<Vec<Address>>,
}

impl AddressPair {
    /// First sender address, lowercased (`"unknown"` when missing).
    pub fn from_addr(&self) -> String {
        first_addr(self.from.as_deref())
    }

    /// First recipient address, lowercased (`"unknown"` when missing).
    pub fn to_addr(&self) -> String {
        first_addr(self.to.as_deref())
    }
}

fn first_addr(list: Option<&[Address]>) -> String {
    list.and_then(|l| l.first())
        .map(Address::addr_lower)
        .unwrap_or_else(|| "unknown".to_string())
}

/// One HTML body part reference from the `htmlBody` property.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyPart {
    /// Key into the message's `bodyValues` map.
    #[serde(rename = "partId", default)]
    pub part_id: Option<String>,
    /// Declared size of the part in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Decoded text for one body part.
#[derive(Debug, Clone, Deserialize)]
pub struct BodyValue {
    #[serde(default)]
    pub value: String,
    /// True when the server truncated the part at `maxBodyValueBytes`.
    #[serde(rename = "isTruncated", default)]
    pub is_truncated: bool,
}

/// Immutable snapshot of one message, as fetched for unsubscribe resolution.
///
/// Produced once by [`JmapClient::fetch_sample_email`]; read-only within the
/// resolution engine.
///
/// [`JmapClient::fetch_sample_email`]: crate::jmap::JmapClient::fetch_sample_email
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRecord {
    #[serde(default)]
    pub subject: Option<String>,

    #[serde(rename = "receivedAt", default)]
    pub received_at: Option<DateTime<Utc>>,

    /// Raw `List-Unsubscribe` header value, if present.
    #[serde(rename = "header:list-unsubscribe", default)]
    pub list_unsubscribe: Option<String>,

    /// Raw `List-Unsubscribe-Post` header value, if present.
    #[serde(rename = "header:list-unsubscribe-post", default)]
    pub list_unsubscribe_post: Option<String>,

    /// Ordered HTML body part references.
    #[serde(rename = "htmlBody", default)]
    pub html_body: Vec<BodyPart>,

    /// Part id → decoded text content.
    #[serde(rename = "bodyValues", default)]
    pub body_values: HashMap<String, BodyValue>,
}

impl EmailRecord {
    /// Iterate over the decoded HTML text of each body part, in part order.
    ///
    /// Parts whose id is missing from `bodyValues` are skipped.
    pub fn html_parts(&self) -> impl Iterator<Item = &str> {
        self.html_body.iter().filter_map(|part| {
            let id = part.part_id.as_deref()?;
            self.body_values.get(id).map(|bv| bv.value.as_str())
        })
    }

    /// Subject for display, with a placeholder when absent.
    pub fn subject_or_placeholder(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }
}

/// Lightweight listing entry for `tail`/`watch` (no body content).
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSummary {
    pub id: String,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub from: Option<Vec<Address>>,

    #[serde(rename = "receivedAt")]
    pub received_at: DateTime<Utc>,

    #[serde(default)]
    pub size: u64,

    /// Mailbox membership (id → true).
    #[serde(rename = "mailboxIds", default)]
    pub mailbox_ids: HashMap<String, bool>,
}

impl EmailSummary {
    /// First sender address (`"unknown"` when missing).
    pub fn sender_addr(&self) -> String {
        first_addr(self.from.as_deref())
    }

    /// Subject for display, with a placeholder when absent.
    pub fn subject_or_placeholder(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }
}
