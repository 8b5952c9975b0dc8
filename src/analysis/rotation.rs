//! Rotation progress tracking
//!
//! Latches which of centre, left and right the user has reached during one
//! recording. Latches only ever go from false to true until [`reset`].
//!
//! [`reset`]: RotationProgressTracker::reset

use super::head_pose::HeadPoseEstimate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationProgress {
    pub center: bool,
    pub left: bool,
    pub right: bool,
}

impl RotationProgress {
    pub fn complete(&self) -> bool {
        self.center && self.left && self.right
    }

    /// Number of latched directions, 0..=3
    pub fn reached(&self) -> usize {
        [self.center, self.left, self.right]
            .iter()
            .filter(|latched| **latched)
            .count()
    }
}

/// What to ask the user to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPrompt {
    Center,
    Left,
    Right,
    Complete,
}

impl RotationPrompt {
    pub fn instruction(&self) -> &'static str {
        match self {
            RotationPrompt::Center => "Look straight at the camera",
            RotationPrompt::Left => "Slowly turn your head to the left",
            RotationPrompt::Right => "Slowly turn your head to the right",
            RotationPrompt::Complete => "Done, you can stop recording",
        }
    }
}

#[derive(Debug, Default)]
pub struct RotationProgressTracker {
    progress: RotationProgress,
}

impl RotationProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one pose into the latches and return the result
    pub fn update(&mut self, pose: &HeadPoseEstimate) -> RotationProgress {
        let before = self.progress;

        self.progress.center |= pose.is_center;
        self.progress.left |= pose.is_left;
        self.progress.right |= pose.is_right;

        if self.progress != before {
            tracing::debug!(
                "Rotation progress: center={} left={} right={} (relX={:.3})",
                self.progress.center,
                self.progress.left,
                self.progress.right,
                pose.relative_x
            );
            if self.progress.complete() {
                tracing::info!("All head rotations captured");
            }
        }

        self.progress
    }

    pub fn reset(&mut self) {
        self.progress = RotationProgress::default();
    }

    pub fn progress(&self) -> RotationProgress {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress.complete()
    }

    /// Centre first, then left, then right
    pub fn prompt(&self) -> RotationPrompt {
        let p = &self.progress;
        if !p.center {
            RotationPrompt::Center
        } else if !p.left {
            RotationPrompt::Left
        } else if !p.right {
            RotationPrompt::Right
        } else {
            RotationPrompt::Complete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(center: bool, left: bool, right: bool) -> HeadPoseEstimate {
        HeadPoseEstimate {
            is_center: center,
            is_left: left,
            is_right: right,
            ..HeadPoseEstimate::none()
        }
    }

    fn centre() -> HeadPoseEstimate {
        pose(true, false, false)
    }

    fn left() -> HeadPoseEstimate {
        pose(false, true, false)
    }

    fn right() -> HeadPoseEstimate {
        pose(false, false, true)
    }

    #[test]
    fn test_latches_never_clear() {
        let mut tracker = RotationProgressTracker::new();
        let sequence = [centre(), left(), HeadPoseEstimate::none(), right(), centre()];

        let mut previous = RotationProgress::default();
        for p in &sequence {
            let now = tracker.update(p);
            assert!(!previous.center || now.center);
            assert!(!previous.left || now.left);
            assert!(!previous.right || now.right);
            previous = now;
        }
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut a = RotationProgressTracker::new();
        for p in [centre(), centre(), left(), centre(), right()] {
            a.update(&p);
        }

        let mut b = RotationProgressTracker::new();
        for p in [left(), right(), centre()] {
            b.update(&p);
        }

        assert!(a.is_complete());
        assert!(b.is_complete());
        assert_eq!(a.progress(), b.progress());
    }

    #[test]
    fn test_incomplete_without_right() {
        let mut tracker = RotationProgressTracker::new();
        tracker.update(&centre());
        tracker.update(&left());
        assert!(!tracker.is_complete());
        assert_eq!(tracker.progress().reached(), 2);
        assert_eq!(tracker.prompt(), RotationPrompt::Right);
    }

    #[test]
    fn test_single_pose_can_latch_two_directions() {
        let mut tracker = RotationProgressTracker::new();
        let progress = tracker.update(&pose(true, true, false));
        assert!(progress.center && progress.left);
        assert!(!progress.right);
    }

    #[test]
    fn test_reset_clears_all() {
        let mut tracker = RotationProgressTracker::new();
        for p in [centre(), left(), right()] {
            tracker.update(&p);
        }
        assert!(tracker.is_complete());

        tracker.reset();
        assert_eq!(tracker.progress(), RotationProgress::default());
        assert_eq!(tracker.prompt(), RotationPrompt::Center);
    }

    #[test]
    fn test_prompt_order() {
        let mut tracker = RotationProgressTracker::new();
        assert_eq!(tracker.prompt(), RotationPrompt::Center);
        tracker.update(&right());
        // Right already reached, still ask for centre then left
        assert_eq!(tracker.prompt(), RotationPrompt::Center);
        tracker.update(&centre());
        assert_eq!(tracker.prompt(), RotationPrompt::Left);
        tracker.update(&left());
        assert_eq!(tracker.prompt(), RotationPrompt::Complete);
    }
}
