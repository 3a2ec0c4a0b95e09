//! SnapshotService - Snapshot request dispatch
//!
//! ## Responsibilities
//!
//! - Resolve the camera id against the registry
//! - Get a running decode session from the SessionManager
//! - Encode the session's latest frame
//! - Keep the last encoded image per camera so an unchanged frame is not
//!   encoded twice
//!
//! Every failure leaves here as one of `UnknownCamera`, `SourceUnavailable`
//! or `StartTimeout`.

use crate::camera_registry::CameraRegistry;
use crate::error::{Error, Result};
use crate::frame_source::LatestFrame;
use crate::image_encoder::ImageEncoder;
use crate::session_manager::SessionManager;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Encoded snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Compressed image bytes
    pub data: Bytes,
    /// MIME type of `data`
    pub content_type: &'static str,
    /// Frame sequence within the session
    pub sequence: u64,
    /// When the frame was decoded
    pub captured_at: DateTime<Utc>,
    /// Session that decoded the frame
    pub session_id: Uuid,
}

/// Last encoded image for a camera
#[derive(Debug, Clone)]
struct CachedImage {
    session_id: Uuid,
    sequence: u64,
    data: Bytes,
}

/// SnapshotService instance
pub struct SnapshotService {
    registry: Arc<CameraRegistry>,
    sessions: Arc<SessionManager>,
    encoder: Arc<dyn ImageEncoder>,
    cache: RwLock<HashMap<String, CachedImage>>,
}

impl SnapshotService {
    pub fn new(
        registry: Arc<CameraRegistry>,
        sessions: Arc<SessionManager>,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Self {
        Self {
            registry,
            sessions,
            encoder,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the most recent frame of a camera as an encoded image
    ///
    /// Starts a decode session when none is running; a cold start is
    /// bounded by the start timeout.
    pub async fn get_snapshot(&self, camera_id: &str) -> Result<Snapshot> {
        if !self.registry.contains(camera_id) {
            return Err(Error::UnknownCamera(camera_id.to_string()));
        }

        let started = Instant::now();
        let handle = self.sessions.acquire(camera_id).await?;
        let session_id = handle.session_id();
        let latest = handle.latest_frame();
        let result = match latest {
            Some(latest) => self.encode_cached(camera_id, session_id, latest).await,
            None => Err(Error::source_unavailable(
                camera_id,
                "running session has no frame",
            )),
        };
        self.sessions.release(handle);

        let snapshot = result?;
        tracing::debug!(
            camera_id = %camera_id,
            session_id = %session_id,
            sequence = snapshot.sequence,
            size = snapshot.data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Snapshot served"
        );
        Ok(snapshot)
    }

    /// Drop cached images of sessions that no longer exist
    pub async fn prune_cache(&self) -> usize {
        let mut live = HashMap::new();
        for info in self.sessions.sessions().await {
            live.insert(info.camera_id, info.session_id);
        }

        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|camera_id, cached| live.get(camera_id) == Some(&cached.session_id));
        before - cache.len()
    }

    async fn encode_cached(
        &self,
        camera_id: &str,
        session_id: Uuid,
        latest: Arc<LatestFrame>,
    ) -> Result<Snapshot> {
        let snapshot = |data: Bytes| Snapshot {
            data,
            content_type: self.encoder.content_type(),
            sequence: latest.sequence,
            captured_at: latest.captured_at,
            session_id,
        };

        if let Some(cached) = self.cache.read().await.get(camera_id) {
            if cached.session_id == session_id && cached.sequence == latest.sequence {
                return Ok(snapshot(cached.data.clone()));
            }
        }

        let encoder = self.encoder.clone();
        let frame = latest.clone();
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&frame.frame))
            .await
            .map_err(|e| Error::source_unavailable(camera_id, format!("encoder task failed: {}", e)))?;

        let data = match encoded {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                // One bad frame fails this request only
                tracing::warn!(
                    camera_id = %camera_id,
                    session_id = %session_id,
                    sequence = latest.sequence,
                    error = %e,
                    "Failed to encode frame"
                );
                return Err(Error::source_unavailable(camera_id, e.to_string()));
            }
        };

        let mut cache = self.cache.write().await;
        let newer_cached = cache.get(camera_id).is_some_and(|cached| {
            cached.session_id == session_id && cached.sequence > latest.sequence
        });
        if !newer_cached {
            cache.insert(
                camera_id.to_string(),
                CachedImage {
                    session_id,
                    sequence: latest.sequence,
                    data: data.clone(),
                },
            );
        }

        Ok(snapshot(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_registry::CameraConfig;
    use crate::frame_source::{FrameSource, FrameStream, SourceError, VideoFrame};
    use crate::image_encoder::{EncodeError, JpegImageEncoder};
    use crate::session_manager::SessionConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Frames every 10ms; `broken` cameras send frames with a bad buffer
    struct TestSource {
        broken: Vec<&'static str>,
        unreachable: Vec<&'static str>,
    }

    #[async_trait]
    impl FrameSource for TestSource {
        async fn connect(
            &self,
            camera: &CameraConfig,
        ) -> std::result::Result<Box<dyn FrameStream>, SourceError> {
            if self.unreachable.contains(&camera.id.as_str()) {
                return Err(SourceError::Connect("no route to host".to_string()));
            }
            Ok(Box::new(TestStream {
                broken: self.broken.contains(&camera.id.as_str()),
            }))
        }
    }

    struct TestStream {
        broken: bool,
    }

    #[async_trait]
    impl FrameStream for TestStream {
        async fn next_frame(&mut self) -> std::result::Result<Option<VideoFrame>, SourceError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let len = if self.broken { 5 } else { 4 * 4 * 3 };
            Ok(Some(VideoFrame::new(4, 4, vec![200; len])))
        }
    }

    /// Counts encode calls
    struct CountingEncoder {
        inner: JpegImageEncoder,
        calls: AtomicUsize,
    }

    impl ImageEncoder for CountingEncoder {
        fn content_type(&self) -> &'static str {
            self.inner.content_type()
        }

        fn encode(&self, frame: &VideoFrame) -> std::result::Result<Vec<u8>, EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(frame)
        }
    }

    fn service(source: TestSource) -> (SnapshotService, Arc<SessionManager>, Arc<CountingEncoder>) {
        let registry = Arc::new(
            CameraRegistry::new([
                CameraConfig::new("cam0", "rtsp://localhost:8554/cam0"),
                CameraConfig::new("cam1", "rtsp://localhost:8554/cam1"),
                CameraConfig::new("cam2", "rtsp://localhost:8554/cam2"),
            ])
            .unwrap(),
        );
        let config = SessionConfig {
            start_timeout: Duration::from_millis(300),
            ..SessionConfig::default()
        };
        let sessions = Arc::new(SessionManager::new(
            registry.clone(),
            Arc::new(source),
            config,
        ));
        let encoder = Arc::new(CountingEncoder {
            inner: JpegImageEncoder::new(90),
            calls: AtomicUsize::new(0),
        });
        let service = SnapshotService::new(registry, sessions.clone(), encoder.clone());
        (service, sessions, encoder)
    }

    fn healthy() -> TestSource {
        TestSource {
            broken: vec!["cam2"],
            unreachable: vec!["cam1"],
        }
    }

    #[tokio::test]
    async fn test_get_snapshot() {
        let (service, sessions, _) = service(healthy());

        let snapshot = service.get_snapshot("cam0").await.unwrap();
        assert_eq!(snapshot.content_type, "image/jpeg");
        assert_eq!(&snapshot.data[..2], &[0xFF, 0xD8]);
        assert!(snapshot.sequence >= 1);

        let next = service.get_snapshot("cam0").await.unwrap();
        assert_eq!(next.session_id, snapshot.session_id);
        assert!(next.captured_at >= snapshot.captured_at);
        assert_eq!(sessions.stats().sessions_started, 1);
    }

    #[tokio::test]
    async fn test_unknown_camera() {
        let (service, sessions, _) = service(healthy());

        let result = service.get_snapshot("garage").await;
        assert!(matches!(result, Err(Error::UnknownCamera(_))));
        assert!(sessions.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let (service, _, _) = service(healthy());

        let result = service.get_snapshot("cam1").await;
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_bad_frame_keeps_session() {
        let (service, sessions, _) = service(healthy());

        let result = service.get_snapshot("cam2").await;
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        assert_eq!(
            sessions.state("cam2").await,
            Some(crate::session_manager::SessionState::Running)
        );
    }

    #[tokio::test]
    async fn test_unchanged_frame_not_reencoded() {
        let (service, sessions, encoder) = service(healthy());
        let handle = sessions.acquire("cam0").await.unwrap();
        let latest = handle.latest_frame().unwrap();

        let first = service
            .encode_cached("cam0", handle.session_id(), latest.clone())
            .await
            .unwrap();
        let second = service
            .encode_cached("cam0", handle.session_id(), latest)
            .await
            .unwrap();

        assert_eq!(first.data, second.data);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prune_cache() {
        let (service, sessions, _) = service(healthy());
        service.get_snapshot("cam0").await.unwrap();
        assert_eq!(service.prune_cache().await, 0);

        sessions.shutdown().await;
        assert_eq!(service.prune_cache().await, 1);
    }
}
