//! Engine configuration
//!
//! Loaded from a TOML file or built programmatically; every field has a
//! usable default so `EngineConfig::default()` yields a working engine.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Playback engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output device name (None = system default device)
    pub device: Option<String>,

    /// Output buffer size in frames per callback (None = device default)
    pub buffer_size: Option<u32>,

    /// Directory for downloaded tracks (None = system temp dir)
    pub download_dir: Option<PathBuf>,

    /// Event channel capacity
    pub event_capacity: usize,

    /// Initial master volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            buffer_size: None,
            download_dir: None,
            event_capacity: 128,
            volume: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Effective download directory
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tonedeck"))
    }
}
