//! roomd - passkey-protected polling chat-room daemon.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roomd::config::Config;
use roomd::persistence;
use roomd::state::{Registry, now_ms};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "roomd.toml".to_string());

    let config = Config::load_or_default(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(bind = %config.server.bind, "Starting roomd");

    roomd::metrics::init();
    info!("Metrics initialized");

    // Build the registry and reload the last snapshot.
    let (registry, flush_rx) = Registry::new(config.limits.clone());
    let registry = Arc::new(registry);

    let snapshot_path = config.storage.snapshot_path.clone();
    match persistence::load_snapshot(&snapshot_path) {
        Ok(Some(snapshot)) => {
            info!(count = snapshot.rooms.len(), "Loaded rooms from snapshot");
            registry.restore(snapshot.rooms);
        }
        Ok(None) => {
            info!(path = %snapshot_path.display(), "No snapshot found, starting empty");
        }
        Err(e) => {
            // A corrupt snapshot should not take the service down.
            tracing::warn!(path = %snapshot_path.display(), error = %e, "Failed to load snapshot, starting empty");
        }
    }

    // Single-writer snapshot flush task.
    tokio::spawn(persistence::run_flush_task(
        Arc::clone(&registry),
        flush_rx,
        snapshot_path,
    ));
    info!("Snapshot flush task started");

    // Rearm purge timers for deletions scheduled before a restart.
    for (room_id, deadline) in registry.pending_deletions() {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let wait_ms = (deadline - now_ms()).max(0) as u64;
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            if registry.purge_if_due(&room_id, deadline) {
                registry.request_flush();
            }
        });
    }

    roomd::http::serve(config.server.bind, registry).await?;

    Ok(())
}
