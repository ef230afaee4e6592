//! GET /poll - presence bookkeeping plus the message delta.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{reject, require};
use crate::error::RoomError;
use crate::state::room::PollOutput;
use crate::state::{Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    #[serde(default)]
    pub session_token: String,
    /// Millisecond timestamp of the newest message the client has.
    #[serde(default)]
    pub since: i64,
    #[serde(default)]
    pub is_typing: bool,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub success: bool,
    #[serde(flatten)]
    pub output: PollOutput,
}

pub async fn poll(
    State(registry): State<Arc<Registry>>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, RoomError> {
    crate::metrics::record_request("poll");
    let check = || -> Result<(), RoomError> {
        require("roomId", &query.room_id)?;
        require("passkey", &query.passkey)?;
        require("username", &query.username)
    };
    check().map_err(|e| reject("poll", e))?;

    let now = now_ms();
    let handle = registry
        .open(&query.room_id, now)
        .map_err(|e| reject("poll", e))?;
    let output = handle
        .lock()
        .poll(
            &registry.limits,
            now,
            &query.passkey,
            &query.username,
            &query.session_token,
            query.since,
            query.is_typing,
        )
        .map_err(|e| reject("poll", e))?;
    // Presence updates, receipts, and sweeps all mutated the room.
    registry.request_flush();

    Ok(Json(PollResponse {
        success: true,
        output,
    }))
}
