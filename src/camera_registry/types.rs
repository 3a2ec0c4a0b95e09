//! CameraRegistry Type Definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Static camera definition
///
/// Loaded once at start; the set of ids never changes while the process runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera id (the MediaMTX path name, e.g. `cam0`)
    pub id: String,
    /// Stream address the decode session connects to
    pub source_address: String,
}

impl CameraConfig {
    pub fn new(id: impl Into<String>, source_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_address: source_address.into(),
        }
    }

    /// Parse a `<id>=<address>` command line argument
    pub fn parse_arg(arg: &str) -> Result<Self> {
        let (id, address) = arg
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected <id>=<address>, got '{}'", arg)))?;

        let camera = Self::new(id.trim(), address.trim());
        camera.validate()?;
        Ok(camera)
    }

    /// Reject empty ids and addresses
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Config("camera id must not be empty".to_string()));
        }
        if self.id.contains('/') {
            return Err(Error::Config(format!(
                "camera id '{}' must not contain '/'",
                self.id
            )));
        }
        if self.source_address.is_empty() {
            return Err(Error::Config(format!(
                "camera '{}' has an empty source address",
                self.id
            )));
        }
        Ok(())
    }

    /// Source address with any `user:password@` credentials masked, for logs and API output
    pub fn redacted_address(&self) -> String {
        let Some((scheme, rest)) = self.source_address.split_once("://") else {
            return self.source_address.clone();
        };

        let authority_end = rest.find('/').unwrap_or(rest.len());
        match rest[..authority_end].rfind('@') {
            Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
            None => self.source_address.clone(),
        }
    }
}
