//! Recent-mail listing: mbox-style formatting, pager output, and the
//! polling daemon.

pub mod daemon;

use std::collections::HashMap;
use std::io::{IsTerminal, Write};

use humansize::{format_size, BINARY};

use crate::error::Result;
use crate::jmap::{EmailSummary, JmapClient};

/// Format one message as a three-line mbox-style block:
///
/// ```text
/// From sender@example.com  Thu Jun 05 10:12:31 2025
///  Subject: Weekly digest
///   Folder: Inbox    4.2 KiB
/// ```
pub fn format_summary(
    email: &EmailSummary,
    mailboxes: &HashMap<String, String>,
    use_color: bool,
) -> String {
    let date = email
        .received_at
        .with_timezone(&chrono::Local)
        .format("%a %b %d %H:%M:%S %Y");
    let sender = email.sender_addr();
    let subject = email.subject_or_placeholder();
    let size = format_size(email.size, BINARY);
    let folder = email
        .mailbox_ids
        .keys()
        .next()
        .map(|id| mailboxes.get(id).cloned().unwrap_or_else(|| id.clone()))
        .unwrap_or_else(|| "unknown".to_string());

    if use_color {
        format!(
            "From \x1b[1;32m{sender}\x1b[0m  \x1b[33m{date}\x1b[0m\n \
             Subject: \x1b[1;37m{subject}\x1b[0m\n  \
             Folder: \x1b[36m{folder}\x1b[0m\t\x1b[2m{size}\x1b[0m\n"
        )
    } else {
        format!("From {sender}  {date}\n Subject: {subject}\n  Folder: {folder}\t{size}\n")
    }
}

/// Fetch and print the `n` most recent messages, paging through `less -r`
/// when writing to a terminal.
pub fn run_oneshot(client: &JmapClient, n: usize, use_color: bool, no_pager: bool) -> Result<()> {
    let mailboxes = client.fetch_mailboxes()?;
    let emails = client.fetch_summaries(n, None)?;

    let mut output = String::new();
    for email in &emails {
        output.push_str(&format_summary(email, &mailboxes, use_color));
    }

    if no_pager || !std::io::stdout().is_terminal() {
        print!("{output}");
        return Ok(());
    }

    match spawn_pager(&output) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = %e, "Pager unavailable, writing to stdout");
            print!("{output}");
            Ok(())
        }
    }
}

/// Pipe `output` through `less -r` (raw mode, so colors survive).
fn spawn_pager(output: &str) -> std::io::Result<()> {
    let mut pager = std::process::Command::new("less")
        .arg("-r")
        .stdin(std::process::Stdio::piped())
        .spawn()?;
    if let Some(stdin) = pager.stdin.as_mut() {
        // The pager quitting early closes the pipe; that's not an error.
        let _ = stdin.write_all(output.as_bytes());
    }
    pager.wait()?;
    Ok(())
}
