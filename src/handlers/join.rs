//! POST /join - enter (or create) a room.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{optional, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    pub passkey: String,
    pub username: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub admin_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    /// Present on every authenticated request from here on.
    pub session_token: String,
}

pub async fn join(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, RoomError> {
    crate::metrics::record_request("join");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("username", &req.username)
    };
    check().map_err(|e| reject("join", e))?;

    let session_token = registry
        .join(
            now_ms(),
            &req.room_id,
            &req.passkey,
            &req.username,
            optional(&req.session_token),
            optional(&req.admin_code),
        )
        .map_err(|e| reject("join", e))?;
    registry.request_flush();

    Ok(Json(JoinResponse {
        success: true,
        session_token,
    }))
}
