//! FrameSource - Live stream endpoint a decode session connects to
//!
//! ## Contract
//!
//! - `connect` opens one connection for one camera
//! - `next_frame` yields decoded frames in arrival order, `None` when the
//!   stream ends. The future may be dropped at any await point when the
//!   owning session is told to stop; callers only invoke `close` after that.
//! - `close` releases the connection (process, socket, decoder handle).
//!   A session counts as stopped only after `close` returned.
//!
//! Read deadlines are enforced by the decode loop, so implementations may
//! block indefinitely inside `next_frame`.

mod ffmpeg;
mod ppm;

pub use ffmpeg::{FfmpegConfig, FfmpegFrameSource};
pub use ppm::read_ppm_frame;

use crate::camera_registry::CameraConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Frame source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection could not be established
    #[error("connect failed: {0}")]
    Connect(String),

    /// Stream read failed
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stream produced data that is not a frame
    #[error("malformed frame data: {0}")]
    Malformed(String),
}

/// One decoded video frame, packed RGB8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Expected byte length for the frame dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Frame as stored in a decode session
///
/// `sequence` starts at 1 for each session and increases by one per frame.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub frame: VideoFrame,
}

/// Stream endpoint factory
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Open a connection to the camera's source address
    async fn connect(&self, camera: &CameraConfig) -> Result<Box<dyn FrameStream>, SourceError>;
}

/// An open connection yielding decoded frames
#[async_trait]
pub trait FrameStream: Send {
    /// Wait for the next frame; `Ok(None)` means the source ended the stream
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError>;

    /// Release the connection
    async fn close(&mut self) {}
}
