//! Engine configuration loading and config file resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PCMIX_CONFIG";

/// Engine tuning and resource locations.
///
/// Every field is optional in the TOML file; missing fields take the values
/// from [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory that named resources are resolved against
    pub resource_root: PathBuf,

    /// Directory for streamed-backing scratch files (None = OS temp dir)
    pub scratch_dir: Option<PathBuf>,

    /// Output device name (None = default device)
    pub device_name: Option<String>,

    /// Requested device callback size in frames (None = device default)
    pub device_buffer_frames: Option<u32>,

    /// Capacity of the scheduler-to-device bridge in frames
    pub ring_buffer_frames: usize,

    /// Upper bound on frames mixed in one tick
    pub max_block_frames: usize,

    /// Scheduler yield between iterations in milliseconds
    pub tick_interval_ms: u64,

    /// Read-ahead chunk for streamed references in frames
    pub stream_chunk_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            scratch_dir: None,
            device_name: None,
            device_buffer_frames: None,
            ring_buffer_frames: 4410,
            max_block_frames: 1024,
            tick_interval_ms: 1,
            stream_chunk_frames: 4096,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading engine config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ring_buffer_frames == 0 {
            return Err(Error::Config("ring_buffer_frames must be positive".to_string()));
        }
        if self.max_block_frames == 0 {
            return Err(Error::Config("max_block_frames must be positive".to_string()));
        }
        if self.stream_chunk_frames == 0 {
            return Err(Error::Config("stream_chunk_frames must be positive".to_string()));
        }
        Ok(())
    }

    /// Directory used for scratch files
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `PCMIX_CONFIG` environment variable
/// 3. `<user config dir>/pcmix/config.toml` if it exists
///
/// Returns None when no config file applies; callers then use defaults.
pub fn resolve_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("pcmix").join("config.toml"))
        .filter(|p| p.exists())
}
