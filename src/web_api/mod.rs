//! WebAPI - HTTP Endpoints
//!
//! ## Responsibilities
//!
//! - Snapshot route `GET /{cameraId}.jpg`
//! - Health and camera status JSON
//! - Error to status mapping (via `Error: IntoResponse`)

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::{CameraSummary, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        cameras: state.registry.len(),
        active_sessions: state.sessions.sessions().await.len(),
        stats: state.sessions.stats(),
    };

    Json(response)
}

/// Registered cameras with their current session
pub async fn list_cameras(State(state): State<AppState>) -> impl IntoResponse {
    let mut cameras = Vec::with_capacity(state.registry.len());
    for camera in state.registry.iter() {
        cameras.push(CameraSummary {
            camera_id: camera.id.clone(),
            source: camera.redacted_address(),
            session: state.sessions.session_info(&camera.id).await,
        });
    }

    Json(cameras)
}
