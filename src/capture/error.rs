use thiserror::Error;

/// Failure reported by the platform media layer when acquiring a stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformMediaError {
    #[error("not allowed")]
    PermissionDenied,

    #[error("not found")]
    NotFound,

    #[error("not readable (in use)")]
    Busy,

    #[error("{0}")]
    Other(String),
}

/// Camera subsystem errors.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device busy: {0}")]
    DeviceBusy(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("camera session already holds an open stream")]
    SessionActive,

    #[error("stream release failed: {0}")]
    Release(String),
}

impl CameraError {
    /// Map a platform acquisition failure for `device` into the camera taxonomy.
    pub fn from_platform(error: PlatformMediaError, device: &str) -> Self {
        match error {
            PlatformMediaError::PermissionDenied => Self::PermissionDenied(device.to_string()),
            PlatformMediaError::NotFound => Self::DeviceNotFound(device.to_string()),
            PlatformMediaError::Busy => Self::DeviceBusy(device.to_string()),
            PlatformMediaError::Other(message) => Self::Media(format!("{device}: {message}")),
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
