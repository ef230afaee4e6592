//! Test server management.
//!
//! Runs the real router on an ephemeral loopback port inside the test
//! process, optionally with a live snapshot flush task.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use roomd::config::LimitsConfig;
use roomd::persistence;
use roomd::state::Registry;

/// A running test server instance.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    server: JoinHandle<()>,
    flusher: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Spawn a server with default limits and no persistence.
    pub async fn spawn() -> Self {
        Self::spawn_with(LimitsConfig::default(), None).await
    }

    /// Spawn a server with custom limits and no persistence.
    pub async fn spawn_with_limits(limits: LimitsConfig) -> Self {
        Self::spawn_with(limits, None).await
    }

    /// Spawn a server writing snapshots to the given path.
    pub async fn spawn_with(limits: LimitsConfig, snapshot_path: Option<PathBuf>) -> Self {
        let (registry, flush_rx) = Registry::new(limits);
        let registry = Arc::new(registry);

        if let Some(ref path) = snapshot_path {
            if let Ok(Some(snapshot)) = persistence::load_snapshot(path) {
                registry.restore(snapshot.rooms);
            }
        }

        let flusher = snapshot_path.map(|path| {
            tokio::spawn(persistence::run_flush_task(
                Arc::clone(&registry),
                flush_rx,
                path,
            ))
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let app = roomd::http::router(Arc::clone(&registry));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            registry,
            server,
            flusher,
        }
    }

    /// Base URL of this instance.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }
    }
}
