//! JMAP mail-account client (Fastmail-style).
//!
//! Session negotiation, batched `Email/query` + `Email/get` calls, and the
//! typed records the rest of the crate consumes.

pub mod client;
pub mod session;
pub mod types;

pub use client::JmapClient;
pub use session::Session;
pub use types::{Address, AddressPair, BodyPart, BodyValue, EmailRecord, EmailSummary};
