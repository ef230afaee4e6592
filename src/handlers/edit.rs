//! POST /edit - author-only in-place message edit.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

use super::{Ack, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    pub message_id: String,
    pub new_text: String,
}

pub async fn edit(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<EditRequest>,
) -> Result<Json<Ack>, RoomError> {
    crate::metrics::record_request("edit");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("username", &req.username)?;
        require("messageId", &req.message_id)?;
        require("newText", &req.new_text)
    };
    check().map_err(|e| reject("edit", e))?;

    let now = now_ms();
    let handle = registry
        .open(&req.room_id, now)
        .map_err(|e| reject("edit", e))?;
    handle
        .lock()
        .edit(
            &registry.limits,
            now,
            &req.passkey,
            &req.username,
            &req.message_id,
            &req.new_text,
        )
        .map_err(|e| reject("edit", e))?;
    registry.request_flush();

    Ok(Ack::ok())
}
