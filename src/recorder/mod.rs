//! Recording system module
//!
//! - `Recorder` owns start/stop/cancel of one recording against a stream
//! - `MediaEncoder` turns frames into the chunks of the video artifact
//! - `RecordingSession` tracks timing for the progress display
//! - `RecordingSlot` allows one recording at a time per camera platform

pub mod coordinator;
pub mod encoder;
pub mod error;
pub mod slot;
pub mod state;

pub use coordinator::Recorder;
pub use encoder::{FfmpegEncoder, MediaEncoder, RawFrameEncoder};
pub use error::{EncoderError, RecordingError};
pub use slot::{RecordingClaim, RecordingSlot};
pub use state::{EncoderKind, RecordingOptions, RecordingSession, RecordingState};
