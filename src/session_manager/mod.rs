//! SessionManager - At most one decode session per camera
//!
//! ## Responsibilities
//!
//! - Lazily start a decode session on the first snapshot request
//! - Park concurrent cold-start requests on the same start event
//! - Tear down sessions that nobody used for the idle threshold
//! - Remove failed sessions so the next request retries from scratch
//!
//! ## Design
//!
//! - One `Mutex<Option<ActiveSession>>` slot per registered camera. The key
//!   set is fixed at construction, so there is no global lock: unrelated
//!   cameras never wait on each other.
//! - A session leaves its slot only after its decode task has been joined,
//!   i.e. after the source connection was closed. The slot lock is held
//!   meanwhile, so a replacement can never overlap the old one, even when
//!   the request that started the teardown is cancelled half way.
//! - A watcher task per session clears the slot as soon as the decode loop
//!   reports a failure.
//! - No retry loop in here. Each request drives its own retry.

mod session;
mod types;

pub use session::DecodeSession;
pub use types::*;

use crate::camera_registry::{CameraConfig, CameraRegistry};
use crate::error::{Error, Result};
use crate::frame_source::{FrameSource, LatestFrame};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Session plus the task driving it
struct ActiveSession {
    session: Arc<DecodeSession>,
    /// `None` once the task has been joined
    task: Option<JoinHandle<()>>,
}

impl ActiveSession {
    /// Signal stop and wait until the decode loop released its source
    ///
    /// Cancel safe: if the caller is dropped mid-wait the handle stays here
    /// and the next `stop` resumes the wait.
    async fn stop(&mut self) {
        self.session.signal_stop();
        let Some(task) = self.task.as_mut() else {
            return;
        };

        let joined = task.await;
        self.task = None;
        if let Err(e) = joined {
            tracing::error!(
                camera_id = %self.session.camera_id(),
                session_id = %self.session.id(),
                error = %e,
                "Decode task panicked"
            );
        }
    }
}

type Slot = Mutex<Option<ActiveSession>>;

/// Stop the slot's session if `evict` says so, then clear the slot
///
/// The session stays in the slot until its task has been joined.
async fn evict_if(
    slot: &mut Option<ActiveSession>,
    evict: impl FnOnce(&DecodeSession) -> bool,
) -> Option<Arc<DecodeSession>> {
    let active = slot.as_mut().filter(|active| evict(active.session.as_ref()))?;
    active.stop().await;
    slot.take().map(|active| active.session)
}

/// Handle to a running session, returned by [`SessionManager::acquire`]
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<DecodeSession>,
}

impl SessionHandle {
    pub fn camera_id(&self) -> &str {
        self.session.camera_id()
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Latest decoded frame
    pub fn latest_frame(&self) -> Option<Arc<LatestFrame>> {
        self.session.latest_frame()
    }
}

/// SessionManager instance
pub struct SessionManager {
    registry: Arc<CameraRegistry>,
    source: Arc<dyn FrameSource>,
    config: SessionConfig,
    slots: HashMap<String, Arc<Slot>>,
    stats: Arc<StatsCounters>,
}

impl SessionManager {
    /// Create a manager with one empty slot per registered camera
    pub fn new(
        registry: Arc<CameraRegistry>,
        source: Arc<dyn FrameSource>,
        config: SessionConfig,
    ) -> Self {
        let slots = registry
            .ids()
            .map(|id| (id.to_string(), Arc::new(Mutex::new(None))))
            .collect();

        Self {
            registry,
            source,
            config,
            slots,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    /// Get a running session for the camera, starting one if needed
    ///
    /// - Unknown camera: `UnknownCamera`, nothing is created
    /// - No session: starts one and waits for its first frame
    /// - Starting session: waits on the same start event
    /// - Running session: returns immediately
    pub async fn acquire(&self, camera_id: &str) -> Result<SessionHandle> {
        let (camera, slot) = match (self.registry.get(camera_id), self.slots.get(camera_id)) {
            (Some(camera), Some(slot)) => (camera, slot),
            _ => return Err(Error::UnknownCamera(camera_id.to_string())),
        };

        let session = {
            let mut guard = slot.lock().await;

            let stale = evict_if(&mut guard, |session| session.is_terminated()).await;
            if let Some(stale) = stale {
                tracing::debug!(
                    camera_id = %camera_id,
                    session_id = %stale.id(),
                    "Discarded stopped session before restart"
                );
            }

            match guard.as_ref() {
                Some(active) => active.session.clone(),
                None => {
                    let active = self.start_session(camera, slot);
                    let session = active.session.clone();
                    *guard = Some(active);
                    session
                }
            }
        };
        session.touch();

        match session.wait_ready(self.config.start_timeout).await {
            Ok(()) => Ok(SessionHandle { session }),
            Err(failure) => {
                self.discard(slot, session.id()).await;
                Err(failure.into_error(camera_id))
            }
        }
    }
    /// Record that the caller is done with the session; does not stop it
    pub fn release(&self, handle: SessionHandle) {
        handle.session.touch();
        tracing::trace!(
            camera_id = %handle.camera_id(),
            session_id = %handle.session_id(),
            "Session released"
        );
    }

    /// Current session state for a camera, `None` when no session exists
    pub async fn state(&self, camera_id: &str) -> Option<SessionState> {
        let slot = self.slots.get(camera_id)?;
        let guard = slot.lock().await;
        guard.as_ref().map(|active| active.session.state())
    }

    /// Summaries of all sessions currently in the map
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos = Vec::new();
        for camera_id in self.registry.ids() {
            if let Some(info) = self.session_info(camera_id).await {
                infos.push(info);
            }
        }
        infos
    }

    /// Summary of one camera's session
    pub async fn session_info(&self, camera_id: &str) -> Option<SessionInfo> {
        let slot = self.slots.get(camera_id)?;
        let guard = slot.lock().await;
        let session = &guard.as_ref()?.session;
        let latest = session.latest_frame();

        Some(SessionInfo {
            camera_id: camera_id.to_string(),
            session_id: session.id(),
            state: session.state(),
            started_at: session.started_at(),
            idle_sec: session.idle_for().as_secs_f64(),
            frames: latest.as_ref().map(|f| f.sequence).unwrap_or(0),
            last_frame_at: latest.as_ref().map(|f| f.captured_at),
        })
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    /// One idle reaper pass
    ///
    /// Tears down running sessions idle for longer than the threshold with
    /// nobody waiting, and sweeps sessions that already stopped on failure.
    /// Returns the number of sessions removed.
    pub async fn reap_idle(&self) -> usize {
        let results = join_all(
            self.slots
                .iter()
                .map(|(camera_id, slot)| self.reap_slot(camera_id, slot)),
        )
        .await;

        results.into_iter().filter(|reaped| *reaped).count()
    }

    /// Run [`reap_idle`](Self::reap_idle) on the configured interval
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let period = manager.config.reap_interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let reaped = manager.reap_idle().await;
                if reaped > 0 {
                    tracing::debug!(reaped = reaped, "Idle reaper pass");
                }
            }
        })
    }

    /// Stop every session and wait for all sources to be released
    pub async fn shutdown(&self) -> usize {
        let results = join_all(self.slots.iter().map(|(camera_id, slot)| async move {
            let mut guard = slot.lock().await;
            match evict_if(&mut guard, |_| true).await {
                Some(session) => {
                    tracing::info!(
                        camera_id = %camera_id,
                        session_id = %session.id(),
                        "Stopped decode session for shutdown"
                    );
                    true
                }
                None => false,
            }
        }))
        .await;

        results.into_iter().filter(|stopped| *stopped).count()
    }

    fn start_session(&self, camera: &CameraConfig, slot: &Arc<Slot>) -> ActiveSession {
        let (session, decode_loop) = session::new_session(
            camera.clone(),
            self.source.clone(),
            self.config.clone(),
            self.stats.clone(),
        );
        StatsCounters::incr(&self.stats.sessions_started);

        tracing::info!(
            camera_id = %camera.id,
            session_id = %session.id(),
            source = %camera.redacted_address(),
            "Starting decode session"
        );

        let task = tokio::spawn(decode_loop.run());
        spawn_failure_watch(Arc::clone(slot), Arc::clone(&session));
        ActiveSession {
            session,
            task: Some(task),
        }
    }

    /// Remove the given session from its slot if it is still there
    async fn discard(&self, slot: &Slot, session_id: Uuid) {
        let mut guard = slot.lock().await;
        evict_if(&mut guard, |session| session.id() == session_id).await;
    }

    async fn reap_slot(&self, camera_id: &str, slot: &Slot) -> bool {
        let mut guard = slot.lock().await;
        let idle_timeout = self.config.idle_timeout;

        let Some(active) = guard.as_ref() else {
            return false;
        };
        let session = &active.session;

        if session.is_idle(idle_timeout) {
            StatsCounters::incr(&self.stats.idle_teardowns);
            tracing::info!(
                camera_id = %camera_id,
                session_id = %session.id(),
                idle_sec = session.idle_for().as_secs(),
                frames = session.frames_decoded(),
                "Tearing down idle decode session"
            );
        } else if session.is_terminated() {
            tracing::debug!(
                camera_id = %camera_id,
                session_id = %session.id(),
                "Removing stopped decode session"
            );
        } else {
            return false;
        }

        // Slot stays locked until the source is released
        evict_if(&mut guard, |_| true).await.is_some()
    }
}

/// Clear the slot once the session's decode loop reports a failure
///
/// Runs beside the decode task; the decode task itself never takes the
/// slot lock because `ActiveSession::stop` joins it under that lock.
fn spawn_failure_watch(slot: Arc<Slot>, session: Arc<DecodeSession>) {
    tokio::spawn(async move {
        if session.stopped().await.is_none() {
            // Clean stop; whoever requested it clears the slot
            return;
        }

        let mut guard = slot.lock().await;
        let session_id = session.id();
        if evict_if(&mut guard, |current| current.id() == session_id)
            .await
            .is_some()
        {
            tracing::debug!(
                camera_id = %session.camera_id(),
                session_id = %session_id,
                "Removed failed decode session"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::{FrameStream, SourceError, VideoFrame};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    #[derive(Debug, Clone, Copy)]
    enum Behaviour {
        Frames,
        Unreachable,
        Silent,
        EndAfter(u64),
        SilentAfter(u64),
    }

    struct FakeSource {
        behaviours: HashMap<String, Behaviour>,
        connects: StdMutex<HashMap<String, usize>>,
        open_streams: Arc<AtomicUsize>,
        max_open_streams: Arc<AtomicUsize>,
        connect_delay: Duration,
        close_delay: Duration,
    }

    impl FakeSource {
        fn new(behaviours: &[(&str, Behaviour)]) -> Self {
            Self {
                behaviours: behaviours
                    .iter()
                    .map(|(id, b)| (id.to_string(), *b))
                    .collect(),
                connects: StdMutex::new(HashMap::new()),
                open_streams: Arc::new(AtomicUsize::new(0)),
                max_open_streams: Arc::new(AtomicUsize::new(0)),
                connect_delay: Duration::from_millis(50),
                close_delay: Duration::ZERO,
            }
        }

        fn with_close_delay(mut self, close_delay: Duration) -> Self {
            self.close_delay = close_delay;
            self
        }

        fn connects(&self, camera_id: &str) -> usize {
            self.connects
                .lock()
                .unwrap()
                .get(camera_id)
                .copied()
                .unwrap_or(0)
        }

        fn open_streams(&self) -> usize {
            self.open_streams.load(Ordering::SeqCst)
        }

        /// Highest number of streams that were open at the same time
        fn max_open_streams(&self) -> usize {
            self.max_open_streams.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FrameSource for FakeSource {
        async fn connect(
            &self,
            camera: &CameraConfig,
        ) -> std::result::Result<Box<dyn FrameStream>, SourceError> {
            *self
                .connects
                .lock()
                .unwrap()
                .entry(camera.id.clone())
                .or_default() += 1;
            tokio::time::sleep(self.connect_delay).await;

            let behaviour = self
                .behaviours
                .get(&camera.id)
                .copied()
                .unwrap_or(Behaviour::Frames);
            if let Behaviour::Unreachable = behaviour {
                return Err(SourceError::Connect("connection refused".to_string()));
            }

            let open = self.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_open_streams.fetch_max(open, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                behaviour,
                sent: 0,
                open_streams: self.open_streams.clone(),
                close_delay: self.close_delay,
            }))
        }
    }

    struct FakeStream {
        behaviour: Behaviour,
        sent: u64,
        open_streams: Arc<AtomicUsize>,
        close_delay: Duration,
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FrameStream for FakeStream {
        async fn next_frame(&mut self) -> std::result::Result<Option<VideoFrame>, SourceError> {
            match self.behaviour {
                Behaviour::Silent => std::future::pending().await,
                Behaviour::EndAfter(n) if self.sent >= n => Ok(None),
                Behaviour::SilentAfter(n) if self.sent >= n => std::future::pending().await,
                _ => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    self.sent += 1;
                    Ok(Some(VideoFrame::new(2, 2, vec![self.sent as u8; 12])))
                }
            }
        }

        async fn close(&mut self) {
            tokio::time::sleep(self.close_delay).await;
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            start_timeout: Duration::from_millis(300),
            idle_timeout: Duration::from_millis(100),
            reap_interval: Duration::from_millis(50),
            read_timeout: Duration::from_millis(300),
        }
    }

    fn manager(source: Arc<FakeSource>) -> SessionManager {
        let registry = CameraRegistry::new([
            CameraConfig::new("cam0", "rtsp://localhost:8554/cam0"),
            CameraConfig::new("cam1", "rtsp://localhost:8554/cam1"),
        ])
        .unwrap();
        SessionManager::new(Arc::new(registry), source, test_config())
    }

    #[tokio::test]
    async fn test_unknown_camera_has_no_side_effects() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        let result = manager.acquire("cam9").await;
        assert!(matches!(result, Err(Error::UnknownCamera(_))));
        assert!(manager.sessions().await.is_empty());
        assert_eq!(source.connects("cam9"), 0);
        assert_eq!(manager.stats().sessions_started, 0);
    }

    #[tokio::test]
    async fn test_cold_start_then_warm_reuse() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        let first = manager.acquire("cam0").await.unwrap();
        assert_eq!(first.state(), SessionState::Running);
        let frame1 = first.latest_frame().unwrap();
        manager.release(first.clone());

        let started = Instant::now();
        let second = manager.acquire("cam0").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
        let frame2 = second.latest_frame().unwrap();

        assert_eq!(first.session_id(), second.session_id());
        assert!(frame2.sequence >= frame1.sequence);
        assert!(frame2.captured_at >= frame1.captured_at);
        assert_eq!(source.connects("cam0"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_single_connect() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        let results = join_all((0..5).map(|_| manager.acquire("cam0"))).await;

        let ids: Vec<Uuid> = results
            .into_iter()
            .map(|r| r.unwrap().session_id())
            .collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(source.connects("cam0"), 1);
        assert_eq!(manager.stats().sessions_started, 1);
    }

    #[tokio::test]
    async fn test_unreachable_source_fails_all_waiters_identically() {
        let source = Arc::new(FakeSource::new(&[("cam1", Behaviour::Unreachable)]));
        let manager = manager(source.clone());

        let results = join_all((0..5).map(|_| manager.acquire("cam1"))).await;

        let messages: Vec<String> = results
            .into_iter()
            .map(|r| match r {
                Err(e @ Error::SourceUnavailable { .. }) => e.to_string(),
                Err(e) => panic!("unexpected error: {}", e),
                Ok(_) => panic!("unreachable source produced a session"),
            })
            .collect();
        assert!(messages.iter().all(|m| *m == messages[0]));
        assert_eq!(source.connects("cam1"), 1);
        assert_eq!(manager.state("cam1").await, None);

        // Next request retries from scratch
        let again = manager.acquire("cam1").await;
        assert!(matches!(again, Err(Error::SourceUnavailable { .. })));
        assert_eq!(source.connects("cam1"), 2);
        assert_eq!(manager.state("cam1").await, None);
        assert_eq!(manager.stats().source_failures, 2);
    }

    #[tokio::test]
    async fn test_start_timeout() {
        let source = Arc::new(FakeSource::new(&[("cam0", Behaviour::Silent)]));
        let manager = manager(source.clone());

        let result = manager.acquire("cam0").await;
        assert!(matches!(
            result,
            Err(Error::StartTimeout { timeout_ms: 300, .. })
        ));
        assert_eq!(manager.state("cam0").await, None);
        assert_eq!(source.open_streams(), 0);
        assert_eq!(manager.stats().start_timeouts, 1);
    }

    #[tokio::test]
    async fn test_idle_session_reaped() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        let handle = manager.acquire("cam0").await.unwrap();
        let first_id = handle.session_id();
        manager.release(handle);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.reap_idle().await, 1);
        assert_eq!(manager.state("cam0").await, None);
        assert_eq!(source.open_streams(), 0);
        assert_eq!(manager.stats().idle_teardowns, 1);

        // Cold start again
        let handle = manager.acquire("cam0").await.unwrap();
        assert_ne!(handle.session_id(), first_id);
        assert_eq!(source.connects("cam0"), 2);
    }

    #[tokio::test]
    async fn test_recently_used_session_not_reaped() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        let handle = manager.acquire("cam0").await.unwrap();
        manager.release(handle);

        assert_eq!(manager.reap_idle().await, 0);
        assert_eq!(manager.state("cam0").await, Some(SessionState::Running));
    }

    #[tokio::test]
    async fn test_spawned_reaper_tears_down_idle_session() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = Arc::new(manager(source.clone()));
        let reaper = manager.spawn_reaper();

        let handle = manager.acquire("cam0").await.unwrap();
        manager.release(handle);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(manager.state("cam0").await, None);
        assert_eq!(source.open_streams(), 0);

        reaper.abort();
    }

    #[tokio::test]
    async fn test_ended_stream_removed_from_map() {
        let source = Arc::new(FakeSource::new(&[("cam0", Behaviour::EndAfter(3))]));
        let manager = manager(source.clone());

        let handle = manager.acquire("cam0").await.unwrap();
        manager.release(handle.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.state(), SessionState::Stopped);
        assert!(manager.sessions().await.is_empty());
        assert_eq!(manager.state("cam0").await, None);
        assert_eq!(source.open_streams(), 0);

        assert_eq!(manager.reap_idle().await, 0);
        assert_eq!(manager.stats().source_failures, 1);
        assert_eq!(manager.stats().idle_teardowns, 0);
    }

    #[tokio::test]
    async fn test_stalled_stream_fails_after_read_timeout() {
        let source = Arc::new(FakeSource::new(&[("cam0", Behaviour::SilentAfter(2))]));
        let manager = manager(source.clone());

        let handle = manager.acquire("cam0").await.unwrap();
        assert_eq!(handle.state(), SessionState::Running);
        manager.release(handle.clone());

        // Read timeout is 300ms after the last frame
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(handle.state(), SessionState::Stopped);
        assert_eq!(manager.stats().source_failures, 1);
        assert_eq!(source.open_streams(), 0);
        assert_eq!(manager.state("cam0").await, None);

        let again = manager.acquire("cam0").await.unwrap();
        assert_ne!(again.session_id(), handle.session_id());
        assert_eq!(source.connects("cam0"), 2);
    }

    #[tokio::test]
    async fn test_cancelled_acquire_keeps_old_session_until_closed() {
        let source = Arc::new(
            FakeSource::new(&[("cam0", Behaviour::EndAfter(3))])
                .with_close_delay(Duration::from_millis(500)),
        );
        let manager = manager(source.clone());

        manager.acquire("cam0").await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while manager.state("cam0").await != Some(SessionState::Stopping) {
            assert!(Instant::now() < deadline, "session never started closing");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Gives up while the old stream is still closing
        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), manager.acquire("cam0")).await;
        assert!(cancelled.is_err());

        let handle = manager.acquire("cam0").await.unwrap();
        assert_eq!(handle.state(), SessionState::Running);
        assert_eq!(source.connects("cam0"), 2);
        assert_eq!(source.max_open_streams(), 1);
    }

    #[tokio::test]
    async fn test_failed_running_session_restarts_on_acquire() {
        let source = Arc::new(FakeSource::new(&[("cam0", Behaviour::EndAfter(2))]));
        let manager = manager(source.clone());

        let first = manager.acquire("cam0").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = manager.acquire("cam0").await.unwrap();
        assert_ne!(first.session_id(), second.session_id());
        assert_eq!(source.connects("cam0"), 2);
    }

    #[tokio::test]
    async fn test_cameras_are_independent() {
        let source = Arc::new(FakeSource::new(&[("cam0", Behaviour::Silent)]));
        let manager = Arc::new(manager(source.clone()));

        let slow = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire("cam0").await.map(|h| h.session_id()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let started = Instant::now();
        let handle = manager.acquire("cam1").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(handle.state(), SessionState::Running);

        let slow = slow.await.unwrap();
        assert!(matches!(slow, Err(Error::StartTimeout { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_releases_sources() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source.clone());

        manager.acquire("cam0").await.unwrap();
        manager.acquire("cam1").await.unwrap();
        assert_eq!(source.open_streams(), 2);

        assert_eq!(manager.shutdown().await, 2);
        assert_eq!(source.open_streams(), 0);
        assert!(manager.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_info() {
        let source = Arc::new(FakeSource::new(&[]));
        let manager = manager(source);

        let handle = manager.acquire("cam1").await.unwrap();
        let infos = manager.sessions().await;

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].camera_id, "cam1");
        assert_eq!(infos[0].session_id, handle.session_id());
        assert_eq!(infos[0].state, SessionState::Running);
        assert!(infos[0].frames >= 1);
    }
}
