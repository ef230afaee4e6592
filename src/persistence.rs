//! Registry snapshot persistence.
//!
//! The entire registry is flushed to one JSON file after every
//! mutating operation and loaded once at process start. Writes go
//! through a temp file and an atomic rename so a reader never
//! observes a partial snapshot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::state::{Registry, Room};

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// On-disk representation of the whole registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub rooms: Vec<Room>,
}

/// Write a snapshot with write-temp-then-rename semantics. The temp
/// file lives next to the target so the rename stays on one
/// filesystem.
pub fn write_snapshot(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the snapshot at process start. A missing file is a fresh
/// start, not an error.
pub fn load_snapshot(path: &Path) -> Result<Option<RegistrySnapshot>, SnapshotError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnapshotError::Io(e)),
    }
}

/// Single-writer flush loop. Consumes the registry's coalescing flush
/// channel; because there is exactly one writer, a later read of the
/// file always observes the latest completed write.
///
/// Flush failures are logged and counted, never surfaced to clients:
/// the in-memory registry stays authoritative.
pub async fn run_flush_task(registry: Arc<Registry>, mut flush_rx: mpsc::Receiver<()>, path: PathBuf) {
    while flush_rx.recv().await.is_some() {
        let snapshot = RegistrySnapshot {
            rooms: registry.snapshot(),
        };
        let target = path.clone();
        match tokio::task::spawn_blocking(move || write_snapshot(&target, &snapshot)).await {
            Ok(Ok(())) => {
                crate::metrics::record_snapshot_flush("ok");
                tracing::debug!(path = %path.display(), "Registry snapshot written");
            }
            Ok(Err(e)) => {
                crate::metrics::record_snapshot_flush("error");
                tracing::warn!(path = %path.display(), error = %e, "Failed to write registry snapshot");
            }
            Err(e) => {
                crate::metrics::record_snapshot_flush("error");
                tracing::warn!(error = %e, "Snapshot writer task panicked");
            }
        }
    }
    tracing::debug!("Flush channel closed, snapshot writer exiting");
}
