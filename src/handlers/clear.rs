//! POST /clear - wipe the room log down to a single notice.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde::Deserialize;
use std::sync::Arc;

use super::{reject, require};
use crate::error::RoomError;
use crate::state::{Message, Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub room_id: String,
    pub passkey: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    /// The synthetic notice that now makes up the whole log.
    pub message: Message,
}

pub async fn clear(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<ClearResponse>, RoomError> {
    crate::metrics::record_request("clear");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)
    };
    check().map_err(|e| reject("clear", e))?;

    let now = now_ms();
    let handle = registry
        .open(&req.room_id, now)
        .map_err(|e| reject("clear", e))?;
    let message = handle
        .lock()
        .clear(now, &req.passkey)
        .map_err(|e| reject("clear", e))?;
    registry.request_flush();

    Ok(Json(ClearResponse {
        success: true,
        message,
    }))
}
