use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::registry::ConnectionId;
use crate::shared::{AppError, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

#[derive(Debug, Serialize)]
pub struct RoomMembersResponse {
    pub room_id: String,
    pub members: Vec<ConnectionId>,
}

/// GET /api/health
pub async fn health_check(State(app_state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let stats = app_state.router.stats().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        connections: stats.connections,
        rooms: stats.rooms,
    }))
}

/// GET /api/rooms/:room_id/members
pub async fn room_members(
    Path(room_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<RoomMembersResponse>, AppError> {
    let members = app_state.router.members_of(&room_id).await?;
    debug!(room = %room_id, members = members.len(), "Room members requested");
    Ok(Json(RoomMembersResponse { room_id, members }))
}
