//! CameraRegistry - Static camera id -> source address mapping
//!
//! ## Responsibilities
//!
//! - Load the camera list once at start (MediaMTX config or command line)
//! - Validate ids and addresses
//! - Read-only lookups for the session manager and snapshot service
//!
//! The registry is never re-probed or modified after construction.

mod mediamtx;
mod types;

pub use mediamtx::parse_cameras;
pub use types::CameraConfig;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable camera registry
#[derive(Debug, Clone, Default)]
pub struct CameraRegistry {
    cameras: BTreeMap<String, CameraConfig>,
}

impl CameraRegistry {
    /// Build a registry from an explicit camera list
    ///
    /// Fails on empty or duplicate ids.
    pub fn new(cameras: impl IntoIterator<Item = CameraConfig>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for camera in cameras {
            camera.validate()?;
            if map.contains_key(&camera.id) {
                return Err(Error::Config(format!("duplicate camera id '{}'", camera.id)));
            }
            map.insert(camera.id.clone(), camera);
        }
        Ok(Self { cameras: map })
    }

    /// Build a registry from MediaMTX YAML text
    pub fn from_mediamtx_yaml(yaml: &str) -> Result<Self> {
        Self::new(parse_cameras(yaml)?)
    }

    /// Load a registry from a MediaMTX config file
    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = match tokio::fs::read_to_string(path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Config(format!(
                    "config not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let registry = Self::from_mediamtx_yaml(&yaml)?;
        tracing::info!(
            path = %path.display(),
            cameras = registry.len(),
            "Camera registry loaded from mediamtx config"
        );
        Ok(registry)
    }

    /// Look up a camera by id
    pub fn get(&self, camera_id: &str) -> Option<&CameraConfig> {
        self.cameras.get(camera_id)
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.cameras.contains_key(camera_id)
    }

    /// All cameras, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &CameraConfig> {
        self.cameras.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cameras.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}
