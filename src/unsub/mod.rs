//! The unsubscribe resolution engine.
//!
//! Given one [`EmailRecord`](crate::jmap::EmailRecord), the engine inspects
//! its transport headers and HTML body, selects the best available
//! unsubscribe mechanism, performs the corresponding network action, and
//! classifies the result:
//!
//! 1. RFC 8058 one-click POST (`List-Unsubscribe` + `List-Unsubscribe-Post`)
//! 2. `List-Unsubscribe` header URL, fetched and resolved
//! 3. Unsubscribe-looking link in the HTML body, fetched and resolved
//! 4. Nothing actionable (a `mailto:` target is reported for manual use)
//!
//! Fetched pages that neither confirm the unsubscribe nor expose a
//! confirmation form are reported as `Manual` rather than failed.

pub mod executor;
pub mod forms;
pub mod header;
pub mod links;
pub mod resolver;
pub mod scanner;
pub mod vocab;

pub use executor::ActionExecutor;
pub use forms::FormDescriptor;
pub use header::UnsubscribeUris;
pub use links::LinkCandidate;
pub use resolver::{Plan, Resolution, Resolver};

/// Terminal classification of one unsubscribe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The response explicitly confirmed the unsubscribe.
    Success,
    /// The action was accepted (2xx/3xx) without explicit confirmation text.
    LikelySuccess,
    /// A page loaded but no automated path forward was found.
    Manual,
    /// The attempt failed (HTTP ≥ 400 or a transport fault).
    Error,
}

impl OutcomeStatus {
    /// Short lowercase label for display (`[success]`, `[manual]`, …).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::LikelySuccess => "likely_success",
            Self::Manual => "manual",
            Self::Error => "error",
        }
    }
}

/// Status plus a human-readable message; the terminal value of every
/// strategy attempt.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub message: String,
}

impl Outcome {
    pub fn new(status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// True when the attempt counts as a win (`Success` or `LikelySuccess`).
    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Success | OutcomeStatus::LikelySuccess
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status.label(), self.message)
    }
}
