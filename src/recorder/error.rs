//! Recording errors

use thiserror::Error;

/// Errors from a media encoder
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoder process failed: {0}")]
    Process(String),

    #[error("frame buffer holds {actual} bytes, {expected} needed")]
    ShortFrame { expected: usize, actual: usize },

    #[error("frame size changed from {expected:?} to {actual:?}")]
    FrameSizeChanged {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recording start failed: {0}")]
    StartFailed(String),

    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("self photo encoding failed: {0}")]
    SelfPhoto(#[from] png::EncodingError),

    #[error("recording finished without a self photo")]
    SelfPhotoMissing,

    #[error("capture thread failed: {0}")]
    CaptureThread(String),
}

pub type Result<T> = std::result::Result<T, RecordingError>;
