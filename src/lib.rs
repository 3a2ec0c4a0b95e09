//! Snapfeeder Library
//!
//! On-demand JPEG snapshots from RTSP cameras
//!
//! ## Architecture (5 Components)
//!
//! 1. CameraRegistry - Fixed camera id -> source address list
//! 2. SessionManager - At most one decode session per camera, idle teardown
//! 3. SnapshotService - Request dispatch, frame encode
//! 4. FrameSource / ImageEncoder - Decoder and compressor collaborators
//! 5. WebAPI - `GET /{cameraId}.jpg` and status endpoints
//!
//! ## Design Principles
//!
//! - Decode only while somebody is looking
//! - Per-camera serialization, never a global lock
//! - Every request drives its own retry

pub mod camera_registry;
pub mod error;
pub mod frame_source;
pub mod image_encoder;
pub mod models;
pub mod session_manager;
pub mod snapshot_service;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
