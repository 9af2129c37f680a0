//! config.rs — process configuration
//!
//! Loaded once at startup from `bridge.toml` (falling back to the copy embedded
//! in the binary), then overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use fusion_types::COMMAND_PORT;

use crate::reprojector::RasterPolicy;

const EMBEDDED_CONFIG: &str = include_str!("../bridge.toml");

/// Upper bound for `gesture.cooldown_s`.
pub const MAX_COOLDOWN_S: f64 = 3600.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub headset: HeadsetConfig,
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    pub gesture: GestureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadsetConfig {
    /// Headset address; command datagrams go here.
    pub host: String,
    pub command_port: u16,
    /// Folder holding `depth.json` and `color.json`.
    pub calibration_dir: PathBuf,
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_port: COMMAND_PORT,
            calibration_dir: PathBuf::from("calibration"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub color_width: usize,
    pub color_height: usize,
    pub color_fps: u32,
    pub depth_fps: u32,
    /// Seconds of frames each ring buffer retains.
    pub buffer_seconds: u32,
    /// Probability that the synthetic headset reports a lost-tracking pose.
    pub tracking_loss_rate: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            color_width: 1280,
            color_height: 720,
            color_fps: 30,
            depth_fps: 45,
            buffer_seconds: 2,
            tracking_loss_rate: 0.0,
        }
    }
}

impl CaptureConfig {
    pub fn color_capacity(&self) -> usize {
        self.color_fps.saturating_mul(self.buffer_seconds).max(1) as usize
    }

    pub fn depth_capacity(&self) -> usize {
        self.depth_fps.saturating_mul(self.buffer_seconds).max(1) as usize
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub poll_interval_ms: u64,
    /// Reproject depth on every n-th synchronized cycle; 0 disables it.
    pub depth_every: u32,
    pub raster: RasterPolicy,
    /// When false the classifier is skipped and only heartbeats are sent.
    pub gesture_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            depth_every: 0,
            raster: RasterPolicy::Overwrite,
            gesture_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub cooldown_s: f64,
    pub history_capacity: usize,
    /// Landmark whose trail is kept (index fingertip).
    pub tip_landmark: usize,
    /// Fingertip travel, in color pixels, that counts as a swipe.
    pub swipe_min_px: f64,
    /// Frames the swipe classifier looks back over.
    pub swipe_window: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            cooldown_s: 2.0,
            history_capacity: 5,
            tip_landmark: 8,
            swipe_min_px: 120.0,
            swipe_window: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gesture.cooldown_s must be within [0, 3600] seconds, got {0}")]
    Cooldown(f64),
    #[error("gesture.history_capacity must be at least 1")]
    HistoryCapacity,
    #[error("gesture.swipe_window must be at least 2")]
    SwipeWindow,
    #[error("capture frame rates must be non-zero")]
    FrameRate,
    #[error("capture.tracking_loss_rate must be within [0, 1], got {0}")]
    TrackingLossRate(f64),
}

impl BridgeConfig {
    /// Read `path`, or use the embedded defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => {
                info!("Loaded config from {}", path.display());
                text
            }
            Err(e) => {
                warn!("Config {} unavailable ({e}), using embedded defaults", path.display());
                EMBEDDED_CONFIG.to_string()
            }
        };
        let cfg: BridgeConfig =
            toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.gesture;
        if !(0.0..=MAX_COOLDOWN_S).contains(&g.cooldown_s) {
            return Err(ConfigError::Cooldown(g.cooldown_s));
        }
        if g.history_capacity == 0 {
            return Err(ConfigError::HistoryCapacity);
        }
        if g.swipe_window < 2 {
            return Err(ConfigError::SwipeWindow);
        }
        let c = &self.capture;
        if c.color_fps == 0 || c.depth_fps == 0 {
            return Err(ConfigError::FrameRate);
        }
        if !(0.0..=1.0).contains(&c.tracking_loss_rate) {
            return Err(ConfigError::TrackingLossRate(c.tracking_loss_rate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses_and_validates() {
        let cfg: BridgeConfig = toml::from_str(EMBEDDED_CONFIG).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.headset.command_port, 5005);
        assert_eq!(cfg.gesture.cooldown_s, 2.0);
        assert_eq!(cfg.gesture.history_capacity, 5);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: BridgeConfig = toml::from_str("[pipeline]\nraster = \"nearest\"\n").unwrap();
        assert_eq!(cfg.pipeline.raster, RasterPolicy::Nearest);
        assert_eq!(cfg.pipeline.depth_every, 0);
        assert_eq!(cfg.capture.color_width, 1280);
        assert!(cfg.pipeline.gesture_enabled);
    }

    #[test]
    fn rejects_zero_history() {
        let mut cfg = BridgeConfig::default();
        cfg.gesture.history_capacity = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::HistoryCapacity)));
    }

    #[test]
    fn rejects_out_of_range_cooldown() {
        let mut cfg = BridgeConfig::default();
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            cfg.gesture.cooldown_s = bad;
            assert!(matches!(cfg.validate(), Err(ConfigError::Cooldown(_))), "{bad}");
        }
        cfg.gesture.cooldown_s = MAX_COOLDOWN_S;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn huge_buffer_settings_saturate() {
        let c = CaptureConfig { color_fps: u32::MAX, depth_fps: 2, buffer_seconds: u32::MAX, ..CaptureConfig::default() };
        assert_eq!(c.color_capacity(), u32::MAX as usize);
        assert_eq!(c.depth_capacity(), u32::MAX as usize);
    }

    #[test]
    fn buffer_capacity_covers_configured_seconds() {
        let c = CaptureConfig::default();
        assert_eq!(c.color_capacity(), 60);
        assert_eq!(c.depth_capacity(), 90);
    }
}
