//! GET /rooms - public room listing.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

use crate::state::{Registry, RoomSummary};

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub success: bool,
    pub rooms: Vec<RoomSummary>,
}

pub async fn rooms(State(registry): State<Arc<Registry>>) -> Json<RoomsResponse> {
    crate::metrics::record_request("rooms");
    Json(RoomsResponse {
        success: true,
        rooms: registry.list(),
    })
}
