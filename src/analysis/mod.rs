//! Frame analysis
//!
//! Face location, head pose estimation and rotation tracking for sampled
//! frames.

pub mod face_locator;
pub mod head_pose;
pub mod rotation;
pub mod sampler;

pub use face_locator::{FaceCandidate, FaceLocator, SkinToneConfig, SkinToneLocator};
pub use head_pose::{HeadDirection, HeadPoseEstimate, HeadPoseEstimator, PoseThresholds};
pub use rotation::{RotationProgress, RotationProgressTracker, RotationPrompt};
pub use sampler::FrameSampler;

use crate::capture::FrameSample;

/// Locator and estimator run together on each sampled frame
pub struct PoseAnalyzer {
    locator: Box<dyn FaceLocator>,
    estimator: HeadPoseEstimator,
}

impl PoseAnalyzer {
    pub fn new(locator: Box<dyn FaceLocator>, estimator: HeadPoseEstimator) -> Self {
        Self { locator, estimator }
    }

    pub fn skin_tone(config: SkinToneConfig, thresholds: PoseThresholds) -> Self {
        Self::new(
            Box::new(SkinToneLocator::new(config)),
            HeadPoseEstimator::new(thresholds),
        )
    }

    pub fn analyze(&self, frame: &FrameSample) -> HeadPoseEstimate {
        let candidate = self.locator.locate(frame);
        self.estimator
            .estimate(candidate.as_ref(), frame.width, frame.height)
    }
}

impl Default for PoseAnalyzer {
    fn default() -> Self {
        Self::skin_tone(SkinToneConfig::default(), PoseThresholds::default())
    }
}
