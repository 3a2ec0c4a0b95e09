//! MediaMTX configuration loader
//!
//! The install tooling writes one `paths:` entry per local camera into
//! `mediamtx.yml`, each publishing itself through an ffmpeg `runOnInit`
//! command that pushes to `rtsp://localhost:8554/<id>`. Those publisher
//! paths are the cameras we can snapshot.

use super::types::CameraConfig;
use crate::error::Result;
use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

static RTSP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rtsp://[^\s'"]+"#).expect("valid RTSP URL pattern"));

/// Extract cameras from a MediaMTX YAML document
///
/// Only entries with `source: publisher` and an `rtsp://` URL inside
/// `runOnInit` are returned; everything else is skipped silently.
pub fn parse_cameras(yaml: &str) -> Result<Vec<CameraConfig>> {
    let doc: Value = serde_yaml::from_str(yaml)?;

    let Some(paths) = doc.get("paths").and_then(Value::as_mapping) else {
        tracing::warn!("mediamtx config has no 'paths' section");
        return Ok(Vec::new());
    };

    let mut cameras = Vec::new();
    for (name, entry) in paths {
        let Some(name) = name.as_str() else {
            continue;
        };
        if !entry.is_mapping() {
            continue;
        }
        if entry.get("source").and_then(Value::as_str) != Some("publisher") {
            continue;
        }

        let run_on_init = entry
            .get("runOnInit")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match RTSP_URL.find(run_on_init) {
            Some(url) => cameras.push(CameraConfig::new(name, url.as_str())),
            None => {
                tracing::debug!(path = %name, "Publisher path without RTSP URL in runOnInit, skipped");
            }
        }
    }

    Ok(cameras)
}
