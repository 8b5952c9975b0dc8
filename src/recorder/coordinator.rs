//! Recorder
//!
//! Owns the start/stop/cancel lifecycle of one video recording against an
//! open stream. Frames are pulled on a dedicated capture thread at the
//! configured frame rate and fed to a [`MediaEncoder`]; the thread hands the
//! accumulated chunks back through a completion channel when stopped.
//!
//! A recorder holds its stream's [`RecordingSlot`](super::RecordingSlot)
//! while recording, so a second recorder on the same camera platform is
//! refused with `AlreadyRecording`.

use super::encoder::{encoder_for, MediaEncoder};
use super::error::{EncoderError, RecordingError, Result};
use super::slot::RecordingClaim;
use super::state::{RecordingOptions, RecordingSession, RecordingState};
use crate::capture::still::still_artifact;
use crate::capture::{Artifact, ArtifactKind, FrameSample, VideoStream};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Chunks and MIME type produced by the capture thread
struct EncodedVideo {
    mime_type: &'static str,
    chunks: Vec<Vec<u8>>,
}

type Completion = std::result::Result<EncodedVideo, EncoderError>;

/// Handles to a running capture thread
struct ActiveCapture {
    is_recording: Arc<AtomicBool>,
    discard: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    done: oneshot::Receiver<Completion>,
    thread: JoinHandle<()>,
    claim: RecordingClaim,
}

pub struct Recorder {
    options: RecordingOptions,

    /// Current recording state
    state: Arc<RwLock<RecordingState>>,

    /// Timing of the current or last recording
    session: Option<RecordingSession>,

    /// Still captured at the instant recording started
    self_photo: Option<Artifact>,

    active: Option<ActiveCapture>,
}

impl Recorder {
    pub fn new(options: RecordingOptions) -> Self {
        Self {
            options,
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            session: None,
            self_photo: None,
            active: None,
        }
    }

    pub fn options(&self) -> &RecordingOptions {
        &self.options
    }

    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn self_photo(&self) -> Option<&Artifact> {
        self.self_photo.as_ref()
    }

    /// Frames encoded so far in the current recording
    pub fn frame_count(&self) -> u64 {
        match (&self.active, &self.session) {
            (Some(active), _) => active.frames.load(Ordering::Relaxed),
            (None, Some(session)) => session.frame_count,
            (None, None) => 0,
        }
    }

    /// Elapsed time against the soft cap, for display only
    pub fn progress_percent(&self) -> f64 {
        self.session
            .as_ref()
            .map(|s| s.progress_percent(self.options.soft_duration_cap()))
            .unwrap_or(0.0)
    }

    /// Start recording `stream` and capture the self-photo.
    ///
    /// Rejected with `AlreadyRecording` without touching the in-flight
    /// recording, whether that is this recorder's or another one's on the
    /// same camera platform.
    pub fn start(&mut self, stream: Arc<dyn VideoStream>) -> Result<()> {
        if self.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }

        let session = RecordingSession::new();
        let claim = stream.recording_slot().claim(session.id).map_err(|holder| {
            tracing::warn!("Recording {} already in progress, refusing to start", holder);
            RecordingError::AlreadyRecording
        })?;

        if stream.active_tracks() == 0 {
            return Err(RecordingError::StartFailed(format!(
                "stream on {} has no active video track",
                stream.device_id()
            )));
        }

        let first_frame = stream.current_frame().ok_or_else(|| {
            RecordingError::StartFailed(format!("stream on {} has no frame yet", stream.device_id()))
        })?;

        let self_photo = still_artifact(&first_frame, ArtifactKind::SelfPhoto)?;
        let encoder = encoder_for(self.options.encoder, self.options.frame_rate);

        tracing::info!(
            "Starting recording on {} ({}x{} @ {}fps, {})",
            stream.device_id(),
            first_frame.width,
            first_frame.height,
            self.options.frame_rate,
            encoder.mime_type()
        );

        let is_recording = Arc::new(AtomicBool::new(true));
        let discard = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let (done_tx, done) = oneshot::channel();

        let thread = {
            let is_recording = is_recording.clone();
            let discard = discard.clone();
            let frames = frames.clone();
            let interval = self.options.frame_interval();
            std::thread::Builder::new()
                .name("liveness-recorder".to_string())
                .spawn(move || {
                    let result = capture_loop(
                        stream,
                        encoder,
                        first_frame,
                        interval,
                        &is_recording,
                        &discard,
                        &frames,
                    );
                    if let Some(result) = result {
                        let _ = done_tx.send(result);
                    }
                })
                .map_err(|e| RecordingError::StartFailed(format!("failed to spawn capture thread: {e}")))?
        };

        self.active = Some(ActiveCapture {
            is_recording,
            discard,
            frames,
            done,
            thread,
            claim,
        });
        self.session = Some(session);
        self.self_photo = Some(self_photo);
        *self.state.write() = RecordingState::Recording;

        Ok(())
    }

    /// Finalize the recording into one video artifact.
    ///
    /// Returns `Ok(None)` when nothing is recording.
    pub async fn stop(&mut self) -> Result<Option<Artifact>> {
        if !self.is_recording() {
            return Ok(None);
        }
        let Some(active) = self.active.take() else {
            *self.state.write() = RecordingState::Idle;
            return Ok(None);
        };

        tracing::info!("Stopping recording");
        active.is_recording.store(false, Ordering::SeqCst);

        let completion = active.done.await;
        let frame_count = active.frames.load(Ordering::Relaxed);
        let thread = active.thread;
        join_capture_thread(thread).await;
        drop(active.claim);

        if let Some(session) = self.session.as_mut() {
            session.end();
            session.frame_count = frame_count;
        }

        let encoded = match completion {
            Ok(Ok(encoded)) => encoded,
            Ok(Err(e)) => {
                *self.state.write() = RecordingState::Idle;
                return Err(e.into());
            }
            Err(_) => {
                *self.state.write() = RecordingState::Idle;
                return Err(RecordingError::CaptureThread(
                    "capture thread exited without a result".to_string(),
                ));
            }
        };

        let data = encoded.chunks.concat();
        let video = Artifact::new(ArtifactKind::SelfVideo, encoded.mime_type, data);
        *self.state.write() = RecordingState::Stopped;

        tracing::info!(
            "Recording stopped: {} frames in {} chunks, {} bytes, {:.1}s",
            frame_count,
            encoded.chunks.len(),
            video.len(),
            self.session.as_ref().map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0)
        );
        Ok(Some(video))
    }

    /// Discard the recording without producing an artifact.
    ///
    /// Joins the capture thread on the calling thread; async callers use
    /// [`Recorder::discard`].
    pub fn cancel(&mut self) {
        let Some(active) = self.signal_cancel() else {
            return;
        };
        if active.thread.join().is_err() {
            tracing::warn!("Capture thread panicked during cancel");
        }
        drop(active.claim);
        self.finish_cancel();
    }

    /// Discard the recording without producing an artifact, joining the
    /// capture thread off the async runtime
    pub async fn discard(&mut self) {
        let Some(active) = self.signal_cancel() else {
            return;
        };
        join_capture_thread(active.thread).await;
        drop(active.claim);
        self.finish_cancel();
    }

    fn signal_cancel(&mut self) -> Option<ActiveCapture> {
        let active = self.active.take()?;
        active.discard.store(true, Ordering::SeqCst);
        active.is_recording.store(false, Ordering::SeqCst);
        Some(active)
    }

    fn finish_cancel(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.end();
        }
        self.self_photo = None;
        *self.state.write() = RecordingState::Idle;
        tracing::info!("Recording cancelled");
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecordingOptions::default())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn join_capture_thread(thread: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || thread.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => tracing::warn!("Capture thread panicked"),
        Err(e) => tracing::warn!("Failed to join capture thread: {}", e),
    }
}

/// Pull frames at `interval` until stopped. Returns `None` when cancelled.
fn capture_loop(
    stream: Arc<dyn VideoStream>,
    mut encoder: Box<dyn MediaEncoder>,
    first_frame: FrameSample,
    interval: Duration,
    is_recording: &AtomicBool,
    discard: &AtomicBool,
    frames: &AtomicU64,
) -> Option<Completion> {
    let mut chunks = Vec::new();
    let mut next_frame = Some(first_frame);
    let mut deadline = Instant::now();

    loop {
        if let Some(frame) = next_frame.take() {
            match encoder.encode(&frame) {
                Ok(chunk) => {
                    chunks.extend(chunk);
                    frames.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::error!("Encoder failed: {}", e);
                    encoder.abort();
                    return (!discard.load(Ordering::SeqCst)).then_some(Err(e));
                }
            }
        }

        if !is_recording.load(Ordering::SeqCst) {
            break;
        }

        deadline += interval;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        } else {
            // Fell behind; drop the missed frames
            deadline = now;
        }

        if !is_recording.load(Ordering::SeqCst) {
            break;
        }
        next_frame = stream.current_frame();
    }

    if discard.load(Ordering::SeqCst) {
        encoder.abort();
        return None;
    }

    match encoder.finish() {
        Ok(trailing) => {
            chunks.extend(trailing);
            Some(Ok(EncodedVideo {
                mime_type: encoder.mime_type(),
                chunks,
            }))
        }
        Err(e) => Some(Err(e)),
    }
}
