//! POST /admin - moderation: kick/ban a member, or schedule the room
//! for deletion.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{Ack, optional, reject, require};
use crate::error::RoomError;
use crate::state::{Registry, now_ms};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminAction {
    Kick,
    DeleteRoom,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    pub room_id: String,
    pub passkey: String,
    pub admin_user: String,
    pub action: AdminAction,
    #[serde(default)]
    pub target_user: Option<String>,
}

pub async fn admin(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<Ack>, RoomError> {
    crate::metrics::record_request("admin");
    let check = || -> Result<(), RoomError> {
        require("roomId", &req.room_id)?;
        require("passkey", &req.passkey)?;
        require("adminUser", &req.admin_user)
    };
    check().map_err(|e| reject("admin", e))?;

    let now = now_ms();
    let handle = registry
        .open(&req.room_id, now)
        .map_err(|e| reject("admin", e))?;

    match req.action {
        AdminAction::Kick => {
            let Some(target) = optional(&req.target_user) else {
                return Err(reject(
                    "admin",
                    RoomError::Validation("targetUser is required to kick".into()),
                ));
            };
            handle
                .lock()
                .kick(&registry.limits, now, &req.passkey, &req.admin_user, target)
                .map_err(|e| reject("admin", e))?;
        }
        AdminAction::DeleteRoom => {
            let grace_ms = registry.limits.deletion_grace_ms();
            let deadline = handle
                .lock()
                .schedule_deletion(now, grace_ms, &req.passkey, &req.admin_user)
                .map_err(|e| reject("admin", e))?;

            // Deferred hard purge; lazy lookups cover the case where
            // this task never fires (crash before the deadline).
            let registry_for_purge = Arc::clone(&registry);
            let room_id = Registry::sanitize_room_id(&req.room_id)?;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(grace_ms.max(0) as u64)).await;
                if registry_for_purge.purge_if_due(&room_id, deadline) {
                    registry_for_purge.request_flush();
                }
            });
        }
    }
    registry.request_flush();

    Ok(Ack::ok())
}
