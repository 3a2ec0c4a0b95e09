//! ffmpeg-backed frame source
//!
//! One ffmpeg child process per decode session. ffmpeg pulls the RTSP
//! stream, decodes it and writes every frame to stdout as PPM; we parse
//! frames off the pipe. Killing the child releases the RTSP connection and
//! any hardware decoder it held.

use super::{read_ppm_frame, FrameSource, FrameStream, SourceError, VideoFrame};
use crate::camera_registry::CameraConfig;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};

/// Time allowed for ffmpeg to exit after being killed
const EXIT_WAIT: Duration = Duration::from_secs(2);

/// ffmpeg invocation settings
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// ffmpeg binary (name on PATH or absolute path)
    pub binary: String,
    /// RTSP transport (`tcp` or `udp`)
    pub rtsp_transport: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            rtsp_transport: "tcp".to_string(),
        }
    }
}

/// Frame source spawning one ffmpeg decoder per connection
pub struct FfmpegFrameSource {
    config: FfmpegConfig,
}

impl FfmpegFrameSource {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    /// Arguments for decoding `address` into a PPM stream on stdout
    fn args(&self, address: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-fflags",
            "nobuffer",
            "-flags",
            "low_delay",
            "-probesize",
            "512k",
            "-analyzeduration",
            "0",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if address.starts_with("rtsp://") || address.starts_with("rtsps://") {
            args.push("-rtsp_transport".to_string());
            args.push(self.config.rtsp_transport.clone());
        }

        args.extend(
            [
                "-i",
                address,
                "-an",
                "-f",
                "image2pipe",
                "-vcodec",
                "ppm",
                "-pix_fmt",
                "rgb24",
                "-",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn connect(&self, camera: &CameraConfig) -> Result<Box<dyn FrameStream>, SourceError> {
        // kill_on_drop: a session task that is dropped without close()
        // still takes its ffmpeg process down with it
        let mut child = Command::new(&self.config.binary)
            .args(self.args(&camera.source_address))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SourceError::Connect(format!("ffmpeg spawn failed: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Connect("ffmpeg stdout not captured".to_string()))?;

        tracing::debug!(
            camera_id = %camera.id,
            source = %camera.redacted_address(),
            pid = child.id(),
            "ffmpeg decoder spawned"
        );

        Ok(Box::new(FfmpegStream {
            camera_id: camera.id.clone(),
            child,
            stdout: BufReader::with_capacity(256 * 1024, stdout),
        }))
    }
}

/// Decoded frame stream read from an ffmpeg child's stdout
struct FfmpegStream {
    camera_id: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
}

#[async_trait]
impl FrameStream for FfmpegStream {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        read_ppm_frame(&mut self.stdout).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // InvalidInput means the process already exited
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!(camera_id = %self.camera_id, error = %e, "Failed to kill ffmpeg");
            }
        }

        match tokio::time::timeout(EXIT_WAIT, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(camera_id = %self.camera_id, status = %status, "ffmpeg exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(camera_id = %self.camera_id, error = %e, "Failed to reap ffmpeg");
            }
            Err(_) => {
                tracing::warn!(
                    camera_id = %self.camera_id,
                    wait_sec = EXIT_WAIT.as_secs(),
                    "ffmpeg did not exit after kill"
                );
            }
        }
    }
}
