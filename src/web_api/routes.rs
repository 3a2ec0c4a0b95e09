//! API Routes

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::SecondsFormat;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/cameras", get(super::list_cameras))
        // Snapshots: /{camera_id}.jpg
        .route("/:file", get(get_snapshot))
        .with_state(state)
}

/// Latest frame of a camera as JPEG
///
/// Starts the camera's decode session on the first request.
async fn get_snapshot(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response> {
    let camera_id = file
        .strip_suffix(".jpg")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::UnknownCamera(file.clone()))?;

    let snapshot = state.snapshots.get_snapshot(camera_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, snapshot.content_type.to_string()),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            (
                header::HeaderName::from_static("x-frame-sequence"),
                snapshot.sequence.to_string(),
            ),
            (
                header::HeaderName::from_static("x-captured-at"),
                snapshot
                    .captured_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ],
        snapshot.data,
    )
        .into_response())
}
