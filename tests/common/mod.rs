//! Integration test common infrastructure.
//!
//! Spawns in-process roomd servers on loopback ports and wraps the
//! HTTP API in a small typed client.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
