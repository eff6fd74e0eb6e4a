//! `mailsweep`, a command-line toolkit for a JMAP mail account.
//!
//! This crate provides the core library for talking to a JMAP server
//! (Fastmail-style), ranking senders, tailing recent mail, and resolving
//! mailing-list unsubscribe mechanisms.

pub mod config;
pub mod error;
pub mod jmap;
pub mod report;
pub mod tail;
pub mod unsub;
