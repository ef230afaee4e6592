//! The room registry: id sanitizing, lazy creation and purging, and
//! flush signaling toward the persistence bridge.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::LimitsConfig;
use crate::error::{RoomError, RoomResult};
use crate::state::room::Room;

/// Handle to one room, locked exclusively for every mutation.
pub type RoomHandle = Arc<Mutex<Room>>;

/// Public listing entry; exposes no secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub user_count: usize,
}

/// Process-wide room state.
///
/// Handlers receive this behind an `Arc` instead of reaching for a
/// hidden global; tests build their own.
pub struct Registry {
    rooms: DashMap<String, RoomHandle>,
    pub limits: LimitsConfig,
    flush_tx: mpsc::Sender<()>,
}

impl Registry {
    /// Build a registry plus the receiver end of its flush channel,
    /// which the persistence writer task consumes.
    pub fn new(limits: LimitsConfig) -> (Self, mpsc::Receiver<()>) {
        // Capacity 1 with try_send coalesces flush requests: one
        // pending flush already covers every later mutation.
        let (flush_tx, flush_rx) = mpsc::channel(1);
        (
            Self {
                rooms: DashMap::new(),
                limits,
                flush_tx,
            },
            flush_rx,
        )
    }

    /// Strip everything outside `[A-Za-z0-9-]` from a client-supplied
    /// room id.
    pub fn sanitize_room_id(raw: &str) -> RoomResult<String> {
        let id: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        if id.is_empty() {
            return Err(RoomError::Validation("invalid room id format".into()));
        }
        Ok(id)
    }

    /// Resolve a sanitized id to a live room. A room past its
    /// deletion deadline is purged here, so lookups never hand out a
    /// dead room; one still inside the grace window reports closing.
    fn lookup_live(&self, id: &str, now: i64) -> RoomResult<Option<RoomHandle>> {
        let Some(handle) = self.rooms.get(id).map(|r| r.clone()) else {
            return Ok(None);
        };
        let scheduled = handle.lock().deletion_scheduled_at;
        match scheduled {
            Some(deadline) if now >= deadline => {
                self.rooms.remove(id);
                crate::metrics::set_active_rooms(self.rooms.len() as i64);
                tracing::info!(room = %id, "Room purged after grace window");
                Ok(None)
            }
            Some(_) => Err(RoomError::RoomClosing),
            None => Ok(Some(handle)),
        }
    }

    /// Resolve a raw id to a live room or fail the way every
    /// authenticated endpoint does: an unknown room is
    /// indistinguishable from a bad passkey.
    pub fn open(&self, raw_id: &str, now: i64) -> RoomResult<RoomHandle> {
        let id = Self::sanitize_room_id(raw_id)?;
        self.lookup_live(&id, now)?.ok_or(RoomError::AuthFailed)
    }

    /// Join a room, creating it when absent. Genesis requires the
    /// admin code; the supplied passkey becomes permanent.
    pub fn join(
        &self,
        now: i64,
        raw_id: &str,
        passkey: &str,
        username: &str,
        session_token: Option<&str>,
        admin_code: Option<&str>,
    ) -> RoomResult<String> {
        let id = Self::sanitize_room_id(raw_id)?;
        if let Some(handle) = self.lookup_live(&id, now)? {
            return handle.lock().join(
                &self.limits,
                now,
                passkey,
                username,
                session_token,
                admin_code,
            );
        }

        let Some(code) = admin_code else {
            return Err(RoomError::EntryRestricted);
        };
        match self.rooms.entry(id.clone()) {
            Entry::Occupied(occupied) => {
                // Lost a genesis race; fall through to a normal join.
                let handle = occupied.get().clone();
                drop(occupied);
                let result = handle.lock().join(
                    &self.limits,
                    now,
                    passkey,
                    username,
                    session_token,
                    admin_code,
                );
                result
            }
            Entry::Vacant(vacant) => {
                let (room, token) = Room::genesis(&id, passkey, username, code, now);
                vacant.insert(Arc::new(Mutex::new(room)));
                crate::metrics::set_active_rooms(self.rooms.len() as i64);
                Ok(token)
            }
        }
    }

    /// Purge a room whose deletion deadline has passed. Returns true
    /// if the room was removed. Driven by the deferred deletion timer
    /// in addition to lazy lookups.
    pub fn purge_if_due(&self, id: &str, now: i64) -> bool {
        let due = self
            .rooms
            .get(id)
            .is_some_and(|r| r.lock().deletion_scheduled_at.is_some_and(|at| now >= at));
        if due {
            self.rooms.remove(id);
            crate::metrics::set_active_rooms(self.rooms.len() as i64);
            tracing::info!(room = %id, "Room purged after grace window");
        }
        due
    }

    /// List live rooms without exposing secrets.
    pub fn list(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|entry| {
                let room = entry.value().lock();
                RoomSummary {
                    id: room.id.clone(),
                    user_count: room.members.len(),
                }
            })
            .collect()
    }

    /// Ask the persistence bridge for a flush. Never blocks: a full
    /// channel means a flush is already pending and will pick up this
    /// mutation too.
    pub fn request_flush(&self) {
        let _ = self.flush_tx.try_send(());
    }

    /// Clone the full registry contents for a snapshot write.
    pub fn snapshot(&self) -> Vec<Room> {
        self.rooms
            .iter()
            .map(|entry| entry.value().lock().clone())
            .collect()
    }

    /// Reload rooms from a snapshot at process start.
    pub fn restore(&self, rooms: Vec<Room>) {
        for room in rooms {
            self.rooms
                .insert(room.id.clone(), Arc::new(Mutex::new(room)));
        }
        crate::metrics::set_active_rooms(self.rooms.len() as i64);
    }

    /// Rooms with a deletion deadline still outstanding, so the purge
    /// timers can be rearmed after a restart.
    pub fn pending_deletions(&self) -> Vec<(String, i64)> {
        self.rooms
            .iter()
            .filter_map(|entry| {
                let room = entry.value().lock();
                room.deletion_scheduled_at.map(|at| (room.id.clone(), at))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
