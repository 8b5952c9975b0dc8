//! Head pose estimation
//!
//! Turns a face candidate's horizontal position into a yaw classification.
//! The thresholds are empirical and tuned for a roughly centred face at
//! 720p; they are not derived from a calibrated yaw angle.

use super::face_locator::{FaceCandidate, Point};
use serde::{Deserialize, Serialize};

/// Decision thresholds, all as fractions of frame geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoseThresholds {
    /// |relativeX| above this counts as a left/right turn
    pub rotation_threshold: f64,
    /// Centred when the centroid is within this fraction of the shorter side
    pub center_radius_fraction: f64,
    /// |relativeX| above this is "significantly off-centre"
    pub off_center_threshold: f64,
    /// |relativeX| above this is a sustained, unmistakable turn
    pub sustained_threshold: f64,
    /// Display yaw = relativeX × this
    pub yaw_scale_degrees: f64,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            rotation_threshold: 0.08,
            center_radius_fraction: 0.25,
            off_center_threshold: 0.06,
            sustained_threshold: 0.15,
            yaw_scale_degrees: 60.0,
        }
    }
}

/// Single display classification of a pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadDirection {
    Center,
    Left,
    Right,
    None,
}

/// Pose derived from one frame
///
/// `is_center`, `is_left` and `is_right` are independent: a slightly turned
/// face can be both centred and turned. `direction` picks one for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadPoseEstimate {
    /// Centroid offset from the frame centre over half the width, in [-1, 1]
    pub relative_x: f64,
    /// Display-only yaw in degrees
    pub yaw_degrees: f64,
    pub direction: HeadDirection,
    /// In [0, 1]
    pub confidence: f64,
    pub is_center: bool,
    pub is_left: bool,
    pub is_right: bool,
    pub is_significantly_off_center: bool,
    pub is_significant_rotation: bool,
    pub is_sustained_rotation: bool,
}

impl HeadPoseEstimate {
    /// Result for a frame without a face
    pub fn none() -> Self {
        Self {
            relative_x: 0.0,
            yaw_degrees: 0.0,
            direction: HeadDirection::None,
            confidence: 0.0,
            is_center: false,
            is_left: false,
            is_right: false,
            is_significantly_off_center: false,
            is_significant_rotation: false,
            is_sustained_rotation: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadPoseEstimator {
    thresholds: PoseThresholds,
}

impl HeadPoseEstimator {
    pub fn new(thresholds: PoseThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PoseThresholds {
        &self.thresholds
    }

    /// Face shifted right in the image: the user turned their head left
    pub fn is_left(&self, relative_x: f64) -> bool {
        relative_x > self.thresholds.rotation_threshold
    }

    /// Mirror of [`Self::is_left`]
    pub fn is_right(&self, relative_x: f64) -> bool {
        relative_x < -self.thresholds.rotation_threshold
    }

    /// Normalised horizontal offset of `x` from the frame centre
    pub fn relative_x(x: f64, frame_width: u32) -> f64 {
        let half = frame_width as f64 / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        ((x - half) / half).clamp(-1.0, 1.0)
    }

    pub fn estimate(
        &self,
        candidate: Option<&FaceCandidate>,
        frame_width: u32,
        frame_height: u32,
    ) -> HeadPoseEstimate {
        let Some(candidate) = candidate else {
            return HeadPoseEstimate::none();
        };

        let t = &self.thresholds;
        let relative_x = Self::relative_x(candidate.centroid.x, frame_width);
        let magnitude = relative_x.abs();

        let frame_center = Point {
            x: frame_width as f64 / 2.0,
            y: frame_height as f64 / 2.0,
        };
        let radius = frame_width.min(frame_height) as f64 * t.center_radius_fraction;
        let is_center = candidate.centroid.distance(&frame_center) < radius;
        let is_left = self.is_left(relative_x);
        let is_right = self.is_right(relative_x);

        let direction = if is_left {
            HeadDirection::Left
        } else if is_right {
            HeadDirection::Right
        } else if is_center {
            HeadDirection::Center
        } else {
            HeadDirection::None
        };

        HeadPoseEstimate {
            relative_x,
            yaw_degrees: relative_x * t.yaw_scale_degrees,
            direction,
            confidence: (magnitude * 4.0).min(1.0),
            is_center,
            is_left,
            is_right,
            is_significantly_off_center: magnitude > t.off_center_threshold,
            is_significant_rotation: magnitude > t.rotation_threshold,
            is_sustained_rotation: magnitude > t.sustained_threshold,
        }
    }
}
