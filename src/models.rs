//! Shared API models
//!
//! Response bodies of the JSON endpoints.

use crate::session_manager::{SessionInfo, SessionStats};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    /// Registered cameras
    pub cameras: usize,
    /// Decode sessions currently in the session map
    pub active_sessions: usize,
    pub stats: SessionStats,
}

/// Camera entry of `GET /api/cameras`
#[derive(Debug, Clone, Serialize)]
pub struct CameraSummary {
    pub camera_id: String,
    /// Source address with credentials masked
    pub source: String,
    /// Current decode session, if any
    pub session: Option<SessionInfo>,
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
}
