use crate::{AppState, handlers::{diagnostics, health_check, list_rooms, ready_check, room_presence}};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/rooms", get(list_rooms))
        .route("/v1/rooms/:room_id", get(room_presence))
        .with_state(app_state)
}
