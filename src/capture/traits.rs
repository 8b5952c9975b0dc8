//! Capture trait definitions
//!
//! Platform-agnostic descriptions of camera devices and the live streams
//! opened on them.

use super::error::Result;
use super::frame::FrameSample;
use crate::recorder::RecordingSlot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a capture device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of media device reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Video,
    Audio,
}

/// Information about a camera/webcam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    /// Unique device ID
    pub id: DeviceId,

    /// Human readable label (may be empty before permission is granted)
    pub label: String,

    /// Device kind
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    pub fn video(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            label: label.into(),
            kind: DeviceKind::Video,
        }
    }

    /// Name to show in a device picker; unlabeled devices are numbered from 1.
    pub fn display_name(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Which way the camera faces relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Selfie camera ("user" facing mode)
    Front,
    /// Main camera ("environment" facing mode)
    Back,
}

impl Facing {
    /// Label keywords that identify a device with this facing
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Facing::Front => &["front", "user", "selfie", "user-facing", "前置"],
            Facing::Back => &["back", "environment", "rear", "main", "environment-facing", "后置"],
        }
    }

    pub fn opposite(&self) -> Facing {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

/// Constraints requested when opening a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConstraints {
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub facing: Option<Facing>,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            frame_rate: 30,
            facing: Some(Facing::Front),
        }
    }
}

/// Synchronous accessor for the most recent frame of a stream
pub trait FrameSource: Send + Sync {
    /// Snapshot the current frame; `None` while dimensions are not yet known.
    fn current_frame(&self) -> Option<FrameSample>;
}

/// A live video stream bound to one device
///
/// Readers (sampler, recorder) only pull frames; releasing the hardware is
/// the owning `CameraSession`'s job.
pub trait VideoStream: FrameSource {
    /// Device the stream is bound to
    fn device_id(&self) -> &DeviceId;

    /// Number of live hardware tracks (0 once released)
    fn active_tracks(&self) -> usize;

    /// Stop every track and release the device. Must be idempotent.
    fn stop(&self) -> Result<()>;

    /// Slot a recorder must hold while recording this stream
    fn recording_slot(&self) -> RecordingSlot {
        RecordingSlot::global()
    }
}

/// Platform camera backend
///
/// Implemented by the native (nokhwa) backend and by the synthetic backend
/// used for tests and demos.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Enumerate media devices (may include non-video kinds)
    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Acquire a live stream on `device`. This is where permission prompts
    /// and device negotiation happen.
    async fn open_stream(
        &self,
        device: &DeviceId,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlabeled_devices_get_numbered_names() {
        let labeled = DeviceDescriptor::video("a", "FaceTime HD Camera");
        let unlabeled = DeviceDescriptor::video("b", "  ");
        assert_eq!(labeled.display_name(0), "FaceTime HD Camera");
        assert_eq!(unlabeled.display_name(1), "Camera 2");
    }

    #[test]
    fn test_constraints_default_to_720p_front() {
        let constraints = StreamConstraints::default();
        assert_eq!(constraints.resolution.width, 1280);
        assert_eq!(constraints.resolution.height, 720);
        assert_eq!(constraints.facing, Some(Facing::Front));
    }

    #[test]
    fn test_trait_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn CameraBackend>();
        assert_send_sync::<dyn VideoStream>();
    }
}
