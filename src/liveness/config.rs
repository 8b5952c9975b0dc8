//! Liveness capture configuration
//!
//! Loaded from JSON. Every field has a default, so an empty object is a
//! valid configuration.

use crate::analysis::{PoseThresholds, SkinToneConfig};
use crate::capture::StreamConstraints;
use crate::recorder::RecordingOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivenessConfig {
    /// Period of the pose sampling loop
    pub sampling_interval_ms: u64,

    /// How long to wait for the first frame after opening a camera
    pub warmup_timeout_ms: u64,

    pub capture: StreamConstraints,

    pub locator: SkinToneConfig,

    pub pose: PoseThresholds,

    pub recording: RecordingOptions,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 100,
            warmup_timeout_ms: 5000,
            capture: StreamConstraints::default(),
            locator: SkinToneConfig::default(),
            pose: PoseThresholds::default(),
            recording: RecordingOptions::default(),
        }
    }
}

impl LivenessConfig {
    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: LivenessConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(message: &str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(message.to_string()))
        }

        if self.sampling_interval_ms == 0 {
            return invalid("samplingIntervalMs must be positive");
        }
        if self.capture.frame_rate == 0 || self.recording.frame_rate == 0 {
            return invalid("frame rates must be positive");
        }
        if self.capture.resolution.width == 0 || self.capture.resolution.height == 0 {
            return invalid("capture resolution must be non-zero");
        }

        let locator = &self.locator;
        if locator.grid_size == 0 {
            return invalid("locator.gridSize must be positive");
        }
        if !(0.0..1.0).contains(&locator.min_skin_ratio) {
            return invalid("locator.minSkinRatio must be in [0, 1)");
        }
        if locator.min_center_concentration < 0.0 {
            return invalid("locator.minCenterConcentration must not be negative");
        }
        if !(locator.box_fraction > 0.0 && locator.box_fraction <= 1.0) {
            return invalid("locator.boxFraction must be in (0, 1]");
        }

        let pose = &self.pose;
        for (name, value) in [
            ("pose.rotationThreshold", pose.rotation_threshold),
            ("pose.offCenterThreshold", pose.off_center_threshold),
            ("pose.sustainedThreshold", pose.sustained_threshold),
            ("pose.centerRadiusFraction", pose.center_radius_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1]")));
            }
        }

        Ok(())
    }
}
