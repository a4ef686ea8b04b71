use crate::{
    AppState,
    models::{ErrorResponse, RoomListResponse, RoomResponse, RoomSummary},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

/// List the rooms that currently have members
pub async fn list_rooms(State(app_state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = app_state.registry.rooms().await;
    debug!("Listing {} rooms", rooms.len());
    Json(RoomListResponse {
        rooms: rooms.into_iter().map(RoomSummary::from).collect(),
    })
}

/// Presence for one room
pub async fn room_presence(
    State(app_state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomResponse>), (StatusCode, Json<ErrorResponse>)> {
    match app_state.registry.room(&room_id).await {
        Some(room) => Ok((StatusCode::OK, Json(RoomResponse::from(room)))),
        None => {
            info!("Room '{}' requested but has no members", room_id);
            Err(ErrorResponse::reply(
                StatusCode::NOT_FOUND,
                format!("Room '{}' not found", room_id),
            ))
        }
    }
}
