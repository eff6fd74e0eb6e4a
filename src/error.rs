//! Centralized error types for mailsweep.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsweep library.
///
/// Note that unsubscribe *attempts* do not use this type: network and HTTP
/// failures during an attempt are folded into an
/// [`Outcome`](crate::unsub::Outcome) so a single bad page never aborts the
/// run. `SweepError` covers the account-API side, where a failure genuinely
/// means we cannot proceed.
#[derive(Error, Debug)]
pub enum SweepError {
    /// The API token environment variable is not set.
    #[error("{0} environment variable not set")]
    MissingToken(&'static str),

    /// JMAP session negotiation failed.
    #[error("JMAP session negotiation failed: {0}")]
    Session(String),

    /// An HTTP call to the JMAP API failed at the transport level.
    #[error("JMAP API request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The JMAP server answered a method call with an error object.
    #[error("JMAP method '{method}' returned an error: {detail}")]
    JmapMethod { method: String, detail: String },

    /// The JMAP response did not have the shape we expected.
    #[error("Unexpected JMAP response: {0}")]
    BadResponse(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A saved sender snapshot could not be read or written.
    #[error("Snapshot error for '{path}': {reason}")]
    Snapshot { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, SweepError>`.
pub type Result<T> = std::result::Result<T, SweepError>;

impl SweepError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
