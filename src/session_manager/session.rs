//! Decode session and its background loop
//!
//! A `DecodeSession` is the shared, read-only view of one camera's decoder:
//! lifecycle status, latest frame, last access time and waiter count.
//! The matching `DecodeLoop` is the single writer; it owns the frame
//! stream and runs as its own task until the stream fails or a stop is
//! requested.

use super::types::{SessionConfig, SessionFailure, SessionState, SessionStatus, StatsCounters};
use crate::camera_registry::CameraConfig;
use crate::frame_source::{FrameSource, FrameStream, LatestFrame};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Extra time a waiter allows past the start timeout before giving up
/// without a report from the decode loop
const WAIT_GRACE: Duration = Duration::from_millis(500);

/// Shared view of one camera's decode session
pub struct DecodeSession {
    id: Uuid,
    camera_id: String,
    started_at: DateTime<Utc>,
    created: Instant,
    /// Milliseconds after `created` of the most recent access
    last_access_ms: AtomicU64,
    waiters: AtomicUsize,
    status: watch::Receiver<SessionStatus>,
    frames: watch::Receiver<Option<Arc<LatestFrame>>>,
    stop: watch::Sender<bool>,
}

impl DecodeSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state()
    }

    /// Most recently decoded frame, if any arrived yet
    pub fn latest_frame(&self) -> Option<Arc<LatestFrame>> {
        self.frames.borrow().clone()
    }

    /// Number of frames decoded so far
    pub fn frames_decoded(&self) -> u64 {
        self.frames
            .borrow()
            .as_ref()
            .map(|f| f.sequence)
            .unwrap_or(0)
    }

    /// Time since the last acquire or release
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_access_ms.load(Ordering::Acquire));
        self.created.elapsed().saturating_sub(last)
    }

    /// Requests currently blocked on the cold start
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Record an access
    pub(crate) fn touch(&self) {
        let now = self.created.elapsed().as_millis() as u64;
        self.last_access_ms.fetch_max(now, Ordering::AcqRel);
    }

    pub(crate) fn is_terminated(&self) -> bool {
        matches!(self.state(), SessionState::Stopping | SessionState::Stopped)
    }

    pub(crate) fn is_idle(&self, threshold: Duration) -> bool {
        self.state() == SessionState::Running && self.waiters() == 0 && self.idle_for() >= threshold
    }

    /// Ask the decode loop to exit; it notices at its next iteration
    pub(crate) fn signal_stop(&self) {
        self.stop.send_replace(true);
    }

    /// Wait until the session leaves `Starting`
    ///
    /// All waiters observe the same terminal status, so concurrent cold-start
    /// requests get the same frame or the same failure. The decode loop
    /// enforces `start_timeout`; waiters only give up on their own after an
    /// extra grace period.
    pub(crate) async fn wait_ready(&self, start_timeout: Duration) -> Result<(), SessionFailure> {
        let _waiter = WaiterGuard::new(&self.waiters);
        let mut status = self.status.clone();

        let outcome = tokio::time::timeout(
            start_timeout + WAIT_GRACE,
            status.wait_for(|s| *s != SessionStatus::Starting),
        )
        .await;

        match outcome {
            Ok(Ok(status)) => match &*status {
                SessionStatus::Running => Ok(()),
                SessionStatus::Stopped(Some(failure)) => Err(failure.clone()),
                SessionStatus::Starting | SessionStatus::Stopping | SessionStatus::Stopped(None) => {
                    Err(SessionFailure::SourceUnavailable("session stopped".to_string()))
                }
            },
            Ok(Err(_)) => Err(SessionFailure::SourceUnavailable(
                "decode task exited".to_string(),
            )),
            Err(_) => Err(SessionFailure::StartTimeout(start_timeout)),
        }
    }

    /// Resolves once the decode loop published its terminal status
    ///
    /// Returns the failure, or `None` for a requested stop.
    pub(crate) async fn stopped(&self) -> Option<SessionFailure> {
        let mut status = self.status.clone();
        let stopped = status
            .wait_for(|s| matches!(s, SessionStatus::Stopped(_)))
            .await;

        match stopped.as_deref() {
            Ok(SessionStatus::Stopped(failure)) => failure.clone(),
            _ => None,
        }
    }
}

/// Counts a blocked request for as long as it waits, including when the
/// request future is dropped mid-wait
struct WaiterGuard<'a> {
    waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    fn new(waiters: &'a AtomicUsize) -> Self {
        waiters.fetch_add(1, Ordering::AcqRel);
        Self { waiters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Single writer for one `DecodeSession`
pub(crate) struct DecodeLoop {
    session_id: Uuid,
    camera: CameraConfig,
    source: Arc<dyn FrameSource>,
    config: SessionConfig,
    stats: Arc<StatsCounters>,
    status: watch::Sender<SessionStatus>,
    frames: watch::Sender<Option<Arc<LatestFrame>>>,
    stop: watch::Receiver<bool>,
}

/// Create a session in `Starting` state plus the loop that drives it
pub(crate) fn new_session(
    camera: CameraConfig,
    source: Arc<dyn FrameSource>,
    config: SessionConfig,
    stats: Arc<StatsCounters>,
) -> (Arc<DecodeSession>, DecodeLoop) {
    let (status_tx, status_rx) = watch::channel(SessionStatus::Starting);
    let (frames_tx, frames_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);
    let id = Uuid::new_v4();

    let session = Arc::new(DecodeSession {
        id,
        camera_id: camera.id.clone(),
        started_at: Utc::now(),
        created: Instant::now(),
        last_access_ms: AtomicU64::new(0),
        waiters: AtomicUsize::new(0),
        status: status_rx,
        frames: frames_rx,
        stop: stop_tx,
    });

    let decode_loop = DecodeLoop {
        session_id: id,
        camera,
        source,
        config,
        stats,
        status: status_tx,
        frames: frames_tx,
        stop: stop_rx,
    };

    (session, decode_loop)
}

impl DecodeLoop {
    /// Connect, pump frames until failure or stop, then release the source
    pub(crate) async fn run(mut self) {
        let started = Instant::now();
        let start_deadline = started + self.config.start_timeout;

        let connected = tokio::select! {
            biased;
            _ = stop_requested(&mut self.stop) => None,
            result = tokio::time::timeout_at(start_deadline, self.source.connect(&self.camera)) => Some(result),
        };

        let mut stream = match connected {
            None => {
                self.finish(None);
                return;
            }
            Some(Ok(Ok(stream))) => stream,
            Some(Ok(Err(e))) => {
                self.finish(Some(SessionFailure::SourceUnavailable(e.to_string())));
                return;
            }
            Some(Err(_)) => {
                self.finish(Some(SessionFailure::StartTimeout(self.config.start_timeout)));
                return;
            }
        };

        let failure = self.pump(stream.as_mut(), started, start_deadline).await;

        self.status.send_replace(SessionStatus::Stopping);
        stream.close().await;
        drop(stream);

        self.finish(failure);
    }

    async fn pump(
        &mut self,
        stream: &mut dyn FrameStream,
        started: Instant,
        start_deadline: Instant,
    ) -> Option<SessionFailure> {
        let mut sequence = 0u64;
        let mut last_captured: Option<DateTime<Utc>> = None;

        loop {
            let deadline = if sequence == 0 {
                start_deadline
            } else {
                Instant::now() + self.config.read_timeout
            };

            let next = tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop) => return None,
                next = tokio::time::timeout_at(deadline, stream.next_frame()) => next,
            };

            match next {
                Ok(Ok(Some(frame))) => {
                    sequence += 1;
                    let now = Utc::now();
                    let captured_at = match last_captured {
                        Some(prev) if prev > now => prev,
                        _ => now,
                    };
                    last_captured = Some(captured_at);

                    let (width, height) = (frame.width, frame.height);
                    self.frames.send_replace(Some(Arc::new(LatestFrame {
                        sequence,
                        captured_at,
                        frame,
                    })));

                    if sequence == 1 {
                        self.status.send_replace(SessionStatus::Running);
                        tracing::info!(
                            camera_id = %self.camera.id,
                            session_id = %self.session_id,
                            startup_ms = started.elapsed().as_millis() as u64,
                            width = width,
                            height = height,
                            "Decode session running"
                        );
                    }
                }
                Ok(Ok(None)) => {
                    return Some(SessionFailure::SourceUnavailable(
                        "stream ended".to_string(),
                    ));
                }
                Ok(Err(e)) => {
                    return Some(SessionFailure::SourceUnavailable(e.to_string()));
                }
                Err(_) if sequence == 0 => {
                    return Some(SessionFailure::StartTimeout(self.config.start_timeout));
                }
                Err(_) => {
                    return Some(SessionFailure::SourceUnavailable(format!(
                        "no frame within {}ms",
                        self.config.read_timeout.as_millis()
                    )));
                }
            }
        }
    }

    /// Publish the terminal status; waiters are released by this
    fn finish(&self, failure: Option<SessionFailure>) {
        match &failure {
            None => {
                tracing::info!(
                    camera_id = %self.camera.id,
                    session_id = %self.session_id,
                    "Decode session stopped"
                );
            }
            Some(SessionFailure::StartTimeout(timeout)) => {
                StatsCounters::incr(&self.stats.start_timeouts);
                tracing::warn!(
                    camera_id = %self.camera.id,
                    session_id = %self.session_id,
                    timeout_ms = timeout.as_millis() as u64,
                    failure = "start_timeout",
                    "Decode session got no first frame in time"
                );
            }
            Some(failure @ SessionFailure::SourceUnavailable(_)) => {
                StatsCounters::incr(&self.stats.source_failures);
                tracing::warn!(
                    camera_id = %self.camera.id,
                    session_id = %self.session_id,
                    source = %self.camera.redacted_address(),
                    error = %failure,
                    failure = failure.kind(),
                    "Decode session failed"
                );
            }
        }

        self.status.send_replace(SessionStatus::Stopped(failure));
    }
}

/// Resolves once a stop is requested; a dropped sender counts as one
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}
