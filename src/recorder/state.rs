//! Recording state management
//!
//! Defines the recording state machine, session timing and recorder options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Current state of a recorder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Last recording was finalized into an artifact
    Stopped,
}

/// Timing for one recording attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: Uuid,

    /// Wall-clock start
    pub started_at: DateTime<Utc>,

    /// Wall-clock end, once stopped or cancelled
    pub ended_at: Option<DateTime<Utc>>,

    /// Frames handed to the encoder
    pub frame_count: u64,

    #[serde(skip, default = "Instant::now")]
    started: Instant,

    #[serde(skip)]
    duration: Option<Duration>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            frame_count: 0,
            started: Instant::now(),
            duration: None,
        }
    }

    /// End the session; later calls keep the first end time
    pub fn end(&mut self) {
        if self.duration.is_none() {
            self.duration = Some(self.started.elapsed());
            self.ended_at = Some(Utc::now());
        }
    }

    pub fn is_ended(&self) -> bool {
        self.duration.is_some()
    }

    /// Elapsed time so far, frozen once ended
    pub fn elapsed(&self) -> Duration {
        self.duration.unwrap_or_else(|| self.started.elapsed())
    }

    /// Elapsed time against a soft cap, for display only. Clamped to 100.
    pub fn progress_percent(&self, cap: Duration) -> f64 {
        if cap.is_zero() {
            return 100.0;
        }
        (self.elapsed().as_secs_f64() / cap.as_secs_f64() * 100.0).min(100.0)
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Which encoder turns frames into the video artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// One uncompressed RGBA chunk per frame
    #[default]
    Raw,
    /// VP9/WebM through an ffmpeg child process
    Ffmpeg,
}

/// Configuration for recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingOptions {
    /// Capture rate for the video
    pub frame_rate: u32,

    /// Display cap for the progress bar; recording is never stopped on it
    pub soft_duration_cap_secs: u64,

    pub encoder: EncoderKind,
}

impl RecordingOptions {
    pub fn soft_duration_cap(&self) -> Duration {
        Duration::from_secs(self.soft_duration_cap_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.frame_rate.max(1) as u64)
    }
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            soft_duration_cap_secs: 30,
            encoder: EncoderKind::Raw,
        }
    }
}
