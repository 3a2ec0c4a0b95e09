//! Application state
//!
//! Holds all shared components and configuration

use crate::camera_registry::CameraRegistry;
use crate::frame_source::{FfmpegConfig, FrameSource};
use crate::image_encoder::{ImageEncoder, DEFAULT_JPEG_QUALITY};
use crate::session_manager::{
    SessionConfig, SessionManager, DEFAULT_IDLE_TIMEOUT, DEFAULT_READ_TIMEOUT,
    DEFAULT_REAP_INTERVAL, DEFAULT_START_TIMEOUT,
};
use crate::snapshot_service::SnapshotService;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// MediaMTX config the camera list is read from
    pub mediamtx_config: PathBuf,
    /// Connect + first frame deadline
    pub start_timeout: Duration,
    /// Idle period before a session is torn down
    pub idle_timeout: Duration,
    /// Idle reaper tick
    pub reap_interval: Duration,
    /// Per-frame read deadline of a running session
    pub read_timeout: Duration,
    /// JPEG quality 1..=100
    pub jpeg_quality: u8,
    /// ffmpeg executable
    pub ffmpeg_bin: String,
    /// RTSP lower transport passed to ffmpeg
    pub rtsp_transport: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(5050),
            mediamtx_config: std::env::var("MEDIAMTX_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/local/etc/mediamtx.yml")),
            start_timeout: env_parse("START_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_START_TIMEOUT),
            idle_timeout: env_parse("IDLE_TIMEOUT_SEC")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_IDLE_TIMEOUT),
            reap_interval: env_parse("REAP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REAP_INTERVAL),
            read_timeout: env_parse("READ_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_READ_TIMEOUT),
            jpeg_quality: env_parse::<u8>("JPEG_QUALITY")
                .unwrap_or(DEFAULT_JPEG_QUALITY)
                .clamp(1, 100),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            rtsp_transport: std::env::var("RTSP_TRANSPORT").unwrap_or_else(|_| "tcp".to_string()),
        }
    }
}

impl AppConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            start_timeout: self.start_timeout,
            idle_timeout: self.idle_timeout,
            reap_interval: self.reap_interval,
            read_timeout: self.read_timeout,
        }
    }

    pub fn ffmpeg_config(&self) -> FfmpegConfig {
        FfmpegConfig {
            binary: self.ffmpeg_bin.clone(),
            rtsp_transport: self.rtsp_transport.clone(),
        }
    }
}

/// Parse an environment variable, ignoring unset or invalid values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// CameraRegistry (fixed camera list)
    pub registry: Arc<CameraRegistry>,
    /// SessionManager (decode sessions)
    pub sessions: Arc<SessionManager>,
    /// SnapshotService (request dispatch + encode)
    pub snapshots: Arc<SnapshotService>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Wire up all components
    pub fn new(
        config: AppConfig,
        registry: CameraRegistry,
        source: Arc<dyn FrameSource>,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Self {
        let registry = Arc::new(registry);
        let sessions = Arc::new(SessionManager::new(
            registry.clone(),
            source,
            config.session_config(),
        ));
        let snapshots = Arc::new(SnapshotService::new(
            registry.clone(),
            sessions.clone(),
            encoder,
        ));

        Self {
            config,
            registry,
            sessions,
            snapshots,
            started_at: Instant::now(),
        }
    }
}
