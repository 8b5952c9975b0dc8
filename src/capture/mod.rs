//! Camera capture
//!
//! Device discovery, exclusive stream ownership, frame snapshots and still
//! photos. Platform streams sit behind the traits in [`traits`].

pub mod artifact;
pub mod error;
pub mod frame;
pub mod session;
pub mod still;
pub mod synthetic;
pub mod traits;

#[cfg(feature = "native")]
pub mod native;

pub use artifact::{Artifact, ArtifactKind, CaptureArtifacts, DocumentPhotos};
pub use error::{CameraError, PlatformMediaError};
pub use frame::FrameSample;
pub use session::CameraSession;
pub use synthetic::{FaceScript, SyntheticBackend};
pub use traits::{
    CameraBackend, DeviceDescriptor, DeviceId, DeviceKind, Facing, FrameSource, Resolution,
    StreamConstraints, VideoStream,
};
