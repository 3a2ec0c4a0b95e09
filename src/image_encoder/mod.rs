//! ImageEncoder - Raw frame -> compressed image bytes
//!
//! Encoders are stateless; nothing is retained between calls.

use crate::frame_source::VideoFrame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Frame buffer does not match its declared dimensions
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Codec failure
    #[error("encoding failed: {0}")]
    Codec(#[from] image::ImageError),
}

/// Frame compressor
pub trait ImageEncoder: Send + Sync {
    /// MIME type of the produced bytes
    fn content_type(&self) -> &'static str;

    /// Compress one frame
    fn encode(&self, frame: &VideoFrame) -> Result<Vec<u8>, EncodeError>;
}

/// JPEG encoder backed by the `image` crate
#[derive(Debug, Clone)]
pub struct JpegImageEncoder {
    quality: u8,
}

impl JpegImageEncoder {
    /// Create encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegImageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageEncoder for JpegImageEncoder {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&self, frame: &VideoFrame) -> Result<Vec<u8>, EncodeError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(EncodeError::Malformed(format!(
                "zero dimension {}x{}",
                frame.width, frame.height
            )));
        }
        if frame.data.len() != frame.expected_len() {
            return Err(EncodeError::Malformed(format!(
                "{}x{} RGB frame needs {} bytes, got {}",
                frame.width,
                frame.height,
                frame.expected_len(),
                frame.data.len()
            )));
        }

        let mut buffer = Vec::with_capacity(frame.data.len() / 8);
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
            encoder.encode(
                &frame.data,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )?;
        }

        Ok(buffer)
    }
}
