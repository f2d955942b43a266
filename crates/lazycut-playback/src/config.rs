//! Tunables for the preview pipeline.

use lazycut_core::{LazycutError, QualityPreset, Result};
use lazycut_media::ToolPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a playback session.
///
/// Every field has a default, so a partial JSON document is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum number of rendered frames kept (default: 100).
    pub cache_capacity: usize,
    /// Still renders allowed to run at once (default: 2).
    pub max_concurrent_renders: usize,
    /// Deadline for one still render, in milliseconds (default: 5000).
    pub render_timeout_ms: u64,
    /// Sleep while the display size is unknown, in milliseconds (default: 10).
    pub idle_interval_ms: u64,
    /// Sleep after a failed stream start, in milliseconds (default: 20).
    pub stream_retry_ms: u64,
    /// Upper bound on the preview frame rate (default: 30).
    pub preview_fps_cap: u32,
    /// Consecutive streams that end before their first frame before the
    /// position is treated as the end of the media (default: 5).
    pub max_empty_streams: u32,
    /// Preset used when a session opens (default: High).
    pub initial_quality: QualityPreset,
    /// Trim edits remembered for undo (default: 100).
    pub undo_depth: usize,
    pub tools: ToolPaths,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            max_concurrent_renders: 2,
            render_timeout_ms: 5000,
            idle_interval_ms: 10,
            stream_retry_ms: 20,
            preview_fps_cap: 30,
            max_empty_streams: 5,
            initial_quality: QualityPreset::High,
            undo_depth: 100,
            tools: ToolPaths::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn stream_retry(&self) -> Duration {
        Duration::from_millis(self.stream_retry_ms)
    }

    /// Parse a JSON document, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LazycutError::InvalidConfig(format!("Invalid playback config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_renders == 0 {
            return Err(LazycutError::InvalidConfig(
                "max_concurrent_renders must be at least 1".into(),
            ));
        }
        if self.render_timeout_ms == 0 {
            return Err(LazycutError::InvalidConfig(
                "render_timeout_ms must be positive".into(),
            ));
        }
        if self.preview_fps_cap == 0 {
            return Err(LazycutError::InvalidConfig(
                "preview_fps_cap must be positive".into(),
            ));
        }
        Ok(())
    }
}
