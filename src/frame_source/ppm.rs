//! Binary PPM (`P6`) frame reader
//!
//! ffmpeg's `image2pipe` muxer with the `ppm` codec writes every decoded
//! frame as a self-describing PPM image, so frame boundaries and dimensions
//! come straight from the headers.

use super::{SourceError, VideoFrame};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest frame we accept (8K RGB)
const MAX_FRAME_BYTES: usize = 7680 * 4320 * 3;

/// Read one PPM frame
///
/// Returns `Ok(None)` on a clean end of stream before any header byte.
pub async fn read_ppm_frame<R>(reader: &mut R) -> Result<Option<VideoFrame>, SourceError>
where
    R: AsyncRead + Unpin,
{
    let Some(magic) = read_token(reader, true).await? else {
        return Ok(None);
    };
    if magic != "P6" {
        return Err(SourceError::Malformed(format!(
            "unexpected PPM magic '{}'",
            magic
        )));
    }

    let width = read_number(reader, "width").await?;
    let height = read_number(reader, "height").await?;
    let max_value = read_number(reader, "maxval").await?;

    if width == 0 || height == 0 {
        return Err(SourceError::Malformed(format!(
            "zero frame dimension {}x{}",
            width, height
        )));
    }
    if max_value == 0 || max_value > 255 {
        return Err(SourceError::Malformed(format!(
            "unsupported maxval {}",
            max_value
        )));
    }

    let len = width as usize * height as usize * 3;
    if len > MAX_FRAME_BYTES {
        return Err(SourceError::Malformed(format!(
            "frame {}x{} exceeds size limit",
            width, height
        )));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SourceError::Malformed("stream ended inside frame data".to_string())
        } else {
            SourceError::Io(e)
        }
    })?;

    Ok(Some(VideoFrame::new(width, height, data)))
}

async fn read_number<R>(reader: &mut R, field: &str) -> Result<u32, SourceError>
where
    R: AsyncRead + Unpin,
{
    let token = read_token(reader, false)
        .await?
        .ok_or_else(|| SourceError::Malformed(format!("stream ended before {}", field)))?;

    token
        .parse()
        .map_err(|_| SourceError::Malformed(format!("invalid {} '{}'", field, token)))
}

/// Read one whitespace delimited header token, skipping `#` comments
///
/// Consumes exactly one whitespace byte after the token, which for the
/// maxval field is the single separator before the pixel data.
async fn read_token<R>(reader: &mut R, eof_ok: bool) -> Result<Option<String>, SourceError>
where
    R: AsyncRead + Unpin,
{
    let mut token = Vec::new();
    let mut in_comment = false;

    loop {
        let byte = match reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if token.is_empty() && eof_ok {
                    return Ok(None);
                }
                if token.is_empty() {
                    return Err(SourceError::Malformed(
                        "stream ended inside header".to_string(),
                    ));
                }
                break;
            }
            Err(e) => return Err(SourceError::Io(e)),
        };

        if in_comment {
            if byte == b'\n' || byte == b'\r' {
                in_comment = false;
            }
            continue;
        }

        if byte == b'#' && token.is_empty() {
            in_comment = true;
            continue;
        }

        if byte.is_ascii_whitespace() {
            if token.is_empty() {
                continue;
            }
            break;
        }

        if token.len() >= 16 {
            return Err(SourceError::Malformed("header token too long".to_string()));
        }
        token.push(byte);
    }

    String::from_utf8(token)
        .map(Some)
        .map_err(|_| SourceError::Malformed("non-ASCII header".to_string()))
}
