//! POST /leave - voluntary departure.
//!
//! Deliberately silent about failures: a client tearing down has
//! nothing useful to do with an error, so a bad room or passkey is
//! answered with success and no effect.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

use super::{Ack, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    /// True for a deliberate leave (triggers ownership succession),
    /// false for a page unload.
    #[serde(default)]
    pub explicit: bool,
}

pub async fn leave(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<LeaveRequest>,
) -> Result<Json<Ack>, RoomError> {
    crate::metrics::record_request("leave");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("username", &req.username)
    };
    check().map_err(|e| reject("leave", e))?;

    let now = now_ms();
    let Ok(handle) = registry.open(&req.room_id, now) else {
        return Ok(Ack::ok());
    };
    {
        let mut room = handle.lock();
        if room.passkey != req.passkey {
            return Ok(Ack::ok());
        }
        room.leave(&registry.limits, now, &req.username, req.explicit);
    }
    registry.request_flush();

    Ok(Ack::ok())
}
