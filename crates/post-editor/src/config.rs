use std::path::{Path, PathBuf};
use std::time::Duration;

use buletin_post_core::EditorConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "buletin.co";
pub const DEFAULT_AUTHOR_ID: &str = "cyrpoto011";

/// Settings for one editing session. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last change before an autosave fires.
    pub autosave_delay_ms: u64,
    /// How long the "autosaved" indicator stays up.
    pub autosaved_indicator_ms: u64,
    pub host: String,
    pub author_id: String,
    pub editor: EditorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 3000,
            autosaved_indicator_ms: 2000,
            host: DEFAULT_HOST.to_string(),
            author_id: DEFAULT_AUTHOR_ID.to_string(),
            editor: EditorConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SessionConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn autosaved_indicator(&self) -> Duration {
        Duration::from_millis(self.autosaved_indicator_ms)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }
}
