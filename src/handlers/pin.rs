//! POST /pin - toggle/co-sign pin voting.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

use super::{Ack, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinAction {
    Pin,
    Unpin,
}

/// The client echoes the message it wants pinned; only the id
/// matters, extra fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinTarget {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    pub action: PinAction,
    #[serde(default)]
    pub message: Option<PinTarget>,
}

pub async fn pin(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<PinRequest>,
) -> Result<Json<Ack>, RoomError> {
    crate::metrics::record_request("pin");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("username", &req.username)
    };
    check().map_err(|e| reject("pin", e))?;

    let now = now_ms();
    let handle = registry
        .open(&req.room_id, now)
        .map_err(|e| reject("pin", e))?;

    let result = match req.action {
        PinAction::Pin => {
            let Some(target) = req.message.as_ref() else {
                return Err(reject(
                    "pin",
                    RoomError::Validation("message is required to pin".into()),
                ));
            };
            handle
                .lock()
                .pin(&registry.limits, now, &req.passkey, &req.username, &target.id)
        }
        PinAction::Unpin => handle
            .lock()
            .unpin(&registry.limits, now, &req.passkey, &req.username),
    };
    result.map_err(|e| reject("pin", e))?;
    registry.request_flush();

    Ok(Ack::ok())
}
