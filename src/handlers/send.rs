//! POST /send - append a message to the room log.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{reject, require};
use crate::error::RoomError;
use crate::state::{Message, Registry, ReplyRef, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub room_id: String,
    pub passkey: String,
    /// Sender username.
    pub user: String,
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<ReplyRef>,
    #[serde(default)]
    pub is_announcement: bool,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: Message,
}

pub async fn send(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, RoomError> {
    crate::metrics::record_request("send");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("user", &req.user)?;
        require("text", &req.text)
    };
    check().map_err(|e| reject("send", e))?;

    let now = now_ms();
    let handle = registry
        .open(&req.room_id, now)
        .map_err(|e| reject("send", e))?;
    let message = handle
        .lock()
        .send(
            &registry.limits,
            now,
            &req.passkey,
            &req.user,
            &req.text,
            req.reply_to.clone(),
            req.is_announcement,
        )
        .map_err(|e| reject("send", e))?;
    registry.request_flush();

    Ok(Json(SendResponse {
        success: true,
        message,
    }))
}
