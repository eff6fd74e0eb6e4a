//! Polling daemon: watch for new mail and append formatted log lines.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::error::{Result, SweepError};
use crate::jmap::JmapClient;

use super::format_summary;

/// Page size for each poll; also the minimum seed depth on startup.
const POLL_LIMIT: usize = 50;

/// Settings for one daemon run.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
    pub logfile: PathBuf,
    /// Number of recent messages written to the log on startup.
    pub backfill: usize,
    pub use_color: bool,
}

/// Poll for new mail forever, appending one formatted block per message to
/// the log file.
///
/// Startup seeds the seen-id set with the current inbox so the first poll
/// doesn't dump everything; `backfill` optionally writes the most recent N
/// of those seeded messages (oldest first) before polling begins. Poll
/// failures are logged and skipped; an expired session is refreshed in
/// place. Only log-file I/O errors are fatal.
pub fn run(client: &mut JmapClient, opts: &WatchOptions) -> Result<()> {
    tracing::info!(
        interval_secs = opts.interval.as_secs(),
        logfile = %opts.logfile.display(),
        "Starting daemon"
    );

    let mut mailboxes = client.fetch_mailboxes()?;
    let mut seen: HashSet<String> = HashSet::new();

    // Seed with current emails so we don't dump the entire inbox on first run.
    let seed_limit = POLL_LIMIT.max(opts.backfill);
    let seeded = client.fetch_summaries(seed_limit, None)?;
    for email in &seeded {
        seen.insert(email.id.clone());
    }

    let mut last_check = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut log = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&opts.logfile)
        .map_err(|e| SweepError::io(&opts.logfile, e))?;

    let started = chrono::Local::now().format("%a %b %d %H:%M:%S %Y");
    writeln!(log, "# daemon started {started}, watching for new mail")
        .map_err(|e| SweepError::io(&opts.logfile, e))?;

    if opts.backfill > 0 {
        let mut backfill: Vec<_> = seeded.iter().take(opts.backfill).collect();
        backfill.sort_by_key(|email| email.received_at);
        for email in backfill {
            log.write_all(format_summary(email, &mailboxes, opts.use_color).as_bytes())
                .map_err(|e| SweepError::io(&opts.logfile, e))?;
        }
    }
    log.flush().map_err(|e| SweepError::io(&opts.logfile, e))?;

    loop {
        std::thread::sleep(opts.interval);

        match client.fetch_summaries(POLL_LIMIT, Some(&last_check)) {
            Ok(emails) => {
                let mut fresh: Vec<_> = emails
                    .into_iter()
                    .filter(|email| !seen.contains(&email.id))
                    .collect();

                if !fresh.is_empty() {
                    // Oldest first for chronological log order.
                    fresh.sort_by_key(|email| email.received_at);
                    for email in &fresh {
                        seen.insert(email.id.clone());
                        log.write_all(
                            format_summary(email, &mailboxes, opts.use_color).as_bytes(),
                        )
                        .map_err(|e| SweepError::io(&opts.logfile, e))?;
                    }
                    log.flush().map_err(|e| SweepError::io(&opts.logfile, e))?;
                    tracing::debug!(count = fresh.len(), "Logged new messages");
                }

                last_check = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
            }
            Err(SweepError::Http { source })
                if matches!(source.status().map(|s| s.as_u16()), Some(401) | Some(403)) =>
            {
                tracing::warn!("Session expired, refreshing");
                match client.refresh() {
                    Ok(()) => {
                        if let Ok(fresh_boxes) = client.fetch_mailboxes() {
                            mailboxes = fresh_boxes;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Session refresh failed"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Poll error");
            }
        }
    }
}
