//! Error types and handling
//!
//! Crate-wide error type and the stable codes reported to callers.

use crate::capture::CameraError;
use crate::liveness::config::ConfigError;
use crate::recorder::RecordingError;
use crate::submission::BundleError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("No frame from camera {0}")]
    NoFrame(String),

    #[error("Photo encoding error: {0}")]
    Photo(#[from] png::EncodingError),
}

impl LivenessError {
    /// Whether the capture session has to end.
    ///
    /// Soft per-tick conditions never become errors, so everything that
    /// reaches the caller from the camera or recorder ends the session.
    pub fn is_fatal(&self) -> bool {
        match self {
            LivenessError::Camera(_) | LivenessError::Recording(_) | LivenessError::NoFrame(_) => true,
            LivenessError::Config(_) | LivenessError::Bundle(_) | LivenessError::Photo(_) => false,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LivenessError::Camera(e) => match e {
                CameraError::DeviceEnumeration(_) => "DEVICE_ENUMERATION_FAILED",
                CameraError::PermissionDenied(_) => "PERMISSION_DENIED",
                CameraError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
                CameraError::DeviceBusy(_) => "DEVICE_BUSY",
                CameraError::Media(_) => "MEDIA_ERROR",
                CameraError::SessionActive => "SESSION_ACTIVE",
                CameraError::Release(_) => "RELEASE_FAILED",
            },
            LivenessError::Recording(e) => match e {
                RecordingError::StartFailed(_) => "RECORDING_START_FAILED",
                RecordingError::AlreadyRecording => "ALREADY_RECORDING",
                RecordingError::NotRecording => "NOT_RECORDING",
                RecordingError::Encoder(_) => "ENCODER_ERROR",
                RecordingError::SelfPhoto(_) => "SELF_PHOTO_FAILED",
                RecordingError::SelfPhotoMissing => "SELF_PHOTO_MISSING",
                RecordingError::CaptureThread(_) => "RECORDING_ERROR",
            },
            LivenessError::Config(_) => "CONFIG_ERROR",
            LivenessError::Bundle(_) => "BUNDLE_ERROR",
            LivenessError::NoFrame(_) => "NO_FRAME",
            LivenessError::Photo(_) => "PHOTO_ERROR",
        }
    }
}

/// Error response for the wizard
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<LivenessError> for ErrorResponse {
    fn from(error: LivenessError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<CameraError> for ErrorResponse {
    fn from(error: CameraError) -> Self {
        LivenessError::from(error).into()
    }
}

impl From<RecordingError> for ErrorResponse {
    fn from(error: RecordingError) -> Self {
        LivenessError::from(error).into()
    }
}

/// Result type alias using LivenessError
pub type LivenessResult<T> = Result<T, LivenessError>;
