//! Per-room member records.

use serde::{Deserialize, Serialize};

/// A live session inside one room.
///
/// Usernames are unique within the room only; the same name may exist
/// in any number of other rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub username: String,
    /// Wall-clock milliseconds of the last poll or send.
    pub last_seen_at: i64,
    /// Opaque secret that must match on every authenticated request.
    pub session_token: String,
    pub is_admin: bool,
    /// Transient; never persisted, reset on snapshot load.
    #[serde(skip)]
    pub is_typing: bool,
    pub joined_at: i64,
}

impl Member {
    pub fn new(username: &str, session_token: String, is_admin: bool, now: i64) -> Self {
        Self {
            username: username.to_string(),
            last_seen_at: now,
            session_token,
            is_admin,
            is_typing: false,
            joined_at: now,
        }
    }

    /// Whether this member has gone silent past the threshold.
    pub fn is_idle(&self, now: i64, timeout_ms: i64) -> bool {
        now - self.last_seen_at >= timeout_ms
    }
}
