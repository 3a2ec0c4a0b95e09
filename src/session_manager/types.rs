//! SessionManager Type Definitions

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Default time allowed for the first frame after a cold start
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);
/// Default idle period before a running session is torn down
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default idle reaper interval
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(5);
/// Default time allowed between two frames of a running session
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Session timing settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connect + first frame deadline
    pub start_timeout: Duration,
    /// Idle threshold for the reaper
    pub idle_timeout: Duration,
    /// Reaper tick
    pub reap_interval: Duration,
    /// Per-frame read deadline once running
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_START_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            reap_interval: DEFAULT_REAP_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Decode session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Terminal session failure, shared by every waiter of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// Connect failed, stream ended, or stream errored
    SourceUnavailable(String),
    /// No first frame within the start timeout
    StartTimeout(Duration),
}

impl SessionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionFailure::SourceUnavailable(_) => "source_unavailable",
            SessionFailure::StartTimeout(_) => "start_timeout",
        }
    }

    /// Classify into the public error taxonomy
    pub fn into_error(self, camera_id: &str) -> Error {
        match self {
            SessionFailure::SourceUnavailable(message) => Error::source_unavailable(camera_id, message),
            SessionFailure::StartTimeout(timeout) => Error::StartTimeout {
                camera_id: camera_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
        }
    }
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFailure::SourceUnavailable(msg) => write!(f, "source unavailable: {}", msg),
            SessionFailure::StartTimeout(timeout) => {
                write!(f, "no frame within {}ms", timeout.as_millis())
            }
        }
    }
}

/// Status published by a decode loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionStatus {
    Starting,
    Running,
    Stopping,
    /// `None` for a clean stop requested by the manager
    Stopped(Option<SessionFailure>),
}

impl SessionStatus {
    pub(crate) fn state(&self) -> SessionState {
        match self {
            SessionStatus::Starting => SessionState::Starting,
            SessionStatus::Running => SessionState::Running,
            SessionStatus::Stopping => SessionState::Stopping,
            SessionStatus::Stopped(_) => SessionState::Stopped,
        }
    }
}

/// Session summary for status APIs
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub camera_id: String,
    pub session_id: Uuid,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub idle_sec: f64,
    pub frames: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_at: Option<DateTime<Utc>>,
}

/// Manager counters snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub sessions_started: u64,
    pub start_timeouts: u64,
    pub source_failures: u64,
    pub idle_teardowns: u64,
}

/// Live counters shared with decode loops
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) sessions_started: AtomicU64,
    pub(crate) start_timeouts: AtomicU64,
    pub(crate) source_failures: AtomicU64,
    pub(crate) idle_teardowns: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            start_timeouts: self.start_timeouts.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            idle_teardowns: self.idle_teardowns.load(Ordering::Relaxed),
        }
    }
}
