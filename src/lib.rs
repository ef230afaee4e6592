//! roomd - a passkey-protected polling chat-room daemon.
//!
//! Rooms live in memory behind a registry; clients join with a shared
//! passkey, exchange short messages, and discover changes through
//! periodic polling. Every mutation flushes a full-registry snapshot
//! to disk, which is loaded back at the next start.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod state;
