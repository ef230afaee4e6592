//! POST /delete-message - owner-only removal of an announcement.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

use super::{Ack, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    pub message_id: String,
}

pub async fn delete_message(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<DeleteMessageRequest>,
) -> Result<Json<Ack>, RoomError> {
    crate::metrics::record_request("delete_message");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("username", &req.username)?;
        require("messageId", &req.message_id)
    };
    check().map_err(|e| reject("delete_message", e))?;

    let handle = registry
        .open(&req.room_id, now_ms())
        .map_err(|e| reject("delete_message", e))?;
    handle
        .lock()
        .delete_message(&req.passkey, &req.username, &req.message_id)
        .map_err(|e| reject("delete_message", e))?;
    registry.request_flush();

    Ok(Ack::ok())
}
