use std::sync::Arc;
use axum::{extract::State, Json};
use chrono::Utc;
use crate::{AppState, models::HealthResponse};
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.service_name.clone(),
        message: "Server is running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint: ready once the registry answers
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let stats = app_state.registry.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.service_name.clone(),
        message: format!("Service is ready ({} rooms)", stats.rooms),
        timestamp: Utc::now(),
    })
}
