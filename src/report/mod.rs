//! Sender-frequency reporting.
//!
//! Paginates through every message received after a cutoff, keeps one
//! `(from, to)` pair per message, and tallies them. Snapshots can be saved
//! to JSON and reloaded so repeated reports don't re-fetch the account.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::jmap::JmapClient;

/// The `(from, to)` pair of one message, lowercased first addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderRecord {
    #[serde(rename = "from")]
    pub from_addr: String,
    #[serde(rename = "to")]
    pub to_addr: String,
}

/// Backoff before retry `attempt` (1-based): `base`, doubled each retry.
pub fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs * 2u64.pow(attempt.saturating_sub(1)))
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

fn is_auth_expired(e: &reqwest::Error) -> bool {
    matches!(
        e.status().map(|s| s.as_u16()),
        Some(401) | Some(403)
    )
}

/// Paginate through all messages received after `after` (RFC 3339) and
/// collect their address pairs.
///
/// Transient connection failures back off and retry (refreshing the session
/// in case it expired); 401/403 refreshes the session immediately.
/// `progress` receives `(fetched_so_far, server_total_if_known)` after each
/// page.
pub fn collect_records(
    client: &mut JmapClient,
    max_retries: u32,
    retry_backoff_secs: u64,
    after: &str,
    progress: &dyn Fn(usize, Option<u64>),
) -> Result<Vec<SenderRecord>> {
    let mut records = Vec::new();
    let mut position = 0usize;
    let mut total: Option<u64> = None;
    let mut retries = 0u32;

    loop {
        let need_total = total.is_none();
        match client.fetch_address_page(after, position, need_total) {
            Ok((pairs, batch_total)) => {
                retries = 0;
                if need_total && batch_total.is_some() {
                    total = batch_total;
                }
                if pairs.is_empty() {
                    break;
                }

                position += pairs.len();
                for pair in &pairs {
                    records.push(SenderRecord {
                        from_addr: pair.from_addr(),
                        to_addr: pair.to_addr(),
                    });
                }
                progress(position, total);

                if let Some(total) = total {
                    if position as u64 >= total {
                        break;
                    }
                }
            }
            Err(SweepError::Http { source }) if is_transient(&source) => {
                retries += 1;
                if retries > max_retries {
                    return Err(SweepError::Http { source });
                }
                let wait = backoff_delay(retry_backoff_secs, retries);
                tracing::warn!(
                    retries,
                    max_retries,
                    wait_secs = wait.as_secs(),
                    "Connection error, retrying"
                );
                std::thread::sleep(wait);
                // Refresh the session in case it expired while we were away.
                client.refresh()?;
            }
            Err(SweepError::Http { source }) if is_auth_expired(&source) => {
                retries += 1;
                if retries > max_retries {
                    return Err(SweepError::Http { source });
                }
                tracing::warn!("Session expired, refreshing");
                std::thread::sleep(Duration::from_secs(1));
                client.refresh()?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}

/// Tally of one address: `(address, message_count)`.
pub type Tally = (String, usize);

/// Top `n` senders by message count. Ties break alphabetically so output
/// is stable across runs.
pub fn top_senders(records: &[SenderRecord], n: usize) -> Vec<Tally> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.from_addr.as_str()).or_default() += 1;
    }
    sorted_tallies(counts, n)
}

/// For one sender, the top `n` of *your* addresses they deliver to, plus
/// the total number of their messages.
pub fn recipients_for(records: &[SenderRecord], sender: &str, n: usize) -> (Vec<Tally>, usize) {
    let sender = sender.to_ascii_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut matched = 0usize;
    for record in records {
        if record.from_addr == sender {
            matched += 1;
            *counts.entry(record.to_addr.as_str()).or_default() += 1;
        }
    }
    (sorted_tallies(counts, n), matched)
}

fn sorted_tallies(counts: HashMap<&str, usize>, n: usize) -> Vec<Tally> {
    let mut sorted: Vec<Tally> = counts
        .into_iter()
        .map(|(addr, count)| (addr.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

/// Save a snapshot of collected records to a JSON file.
pub fn save_records(path: &Path, records: &[SenderRecord]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| SweepError::io(path, e))?;
    serde_json::to_writer(std::io::BufWriter::new(file), records).map_err(|e| {
        SweepError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

/// Load a previously saved snapshot.
pub fn load_records(path: &Path) -> Result<Vec<SenderRecord>> {
    let file = std::fs::File::open(path).map_err(|e| SweepError::io(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| SweepError::Snapshot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
