//! Configuration for the sync core
//!
//! Handles settings like the media root where uploaded source files live.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Sync Configuration Constants
// ============================================================================

/// Default media root when not specified via environment variable.
pub const DEFAULT_MEDIA_ROOT: &str = "./media";

/// Sync core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory uploaded source files are resolved under
    pub media_root: PathBuf,
}

impl SyncConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self {
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
        }
    }

    /// Load config from environment variables
    ///
    /// - `DMP_MEDIA_ROOT`: directory uploaded files are resolved under
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(root) = std::env::var("DMP_MEDIA_ROOT") {
            config.media_root = PathBuf::from(root);
        }

        Ok(config)
    }

    /// Get the media root path
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Resolve a source-relative file path under the media root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SyncConfig::new();
        assert_eq!(config.media_root, PathBuf::from(DEFAULT_MEDIA_ROOT));
    }

    #[test]
    fn test_resolve_under_media_root() {
        let config = SyncConfig {
            media_root: PathBuf::from("/srv/media"),
        };
        assert_eq!(
            config.resolve("uploads/sensors.csv"),
            PathBuf::from("/srv/media/uploads/sensors.csv")
        );
    }
}
