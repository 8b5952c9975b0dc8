//! Synthetic camera backend
//!
//! Renders deterministic RGBA frames (a skin-tone blob on a neutral
//! background) so the whole capture pipeline can run without hardware.
//! Every platform failure can be injected through the builder.

use super::error::{CameraError, PlatformMediaError, Result};
use super::frame::{FrameSample, RGBA_CHANNELS};
use super::traits::{CameraBackend, DeviceDescriptor, DeviceId, DeviceKind, FrameSource, StreamConstraints, VideoStream};
use crate::recorder::RecordingSlot;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Skin colour used for the rendered face
pub const SKIN_RGB: [u8; 3] = [205, 145, 115];

/// Background colour (never classified as skin)
pub const BACKGROUND_RGB: [u8; 3] = [90, 110, 130];

/// Horizontal offset used by the sweep script for a turned head
pub const SWEEP_OFFSET: f64 = 0.2;

/// Where the rendered face sits over time
#[derive(Debug, Clone)]
pub enum FaceScript {
    /// No face in frame
    Absent,
    /// Face at a fixed normalised horizontal offset (-1..1), vertically centred
    Fixed(f64),
    /// Centre, then turned left, then turned right, each held for `dwell`
    Sweep { dwell: Duration },
    /// One entry per frame pulled, cycling; `None` renders an empty frame
    Positions(Vec<Option<f64>>),
}

/// Render a frame with a rectangular skin-tone face at `face` (normalised
/// offsets from the frame centre), or an empty background.
pub fn render_face_frame(width: u32, height: u32, face: Option<(f64, f64)>) -> FrameSample {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * RGBA_CHANNELS);
    for _ in 0..(width as usize * height as usize) {
        pixels.extend_from_slice(&[BACKGROUND_RGB[0], BACKGROUND_RGB[1], BACKGROUND_RGB[2], 255]);
    }

    if let Some((rel_x, rel_y)) = face {
        let half_w = width as f64 / 2.0;
        let half_h = height as f64 / 2.0;
        let cx = half_w + rel_x * half_w;
        let cy = half_h + rel_y * half_h;
        let face_w = width as f64 * 0.3;
        let face_h = height as f64 * 0.45;
        let x0 = (cx - face_w / 2.0).round().max(0.0) as u32;
        let x1 = ((cx + face_w / 2.0).round() as u32).min(width);
        let y0 = (cy - face_h / 2.0).round().max(0.0) as u32;
        let y1 = ((cy + face_h / 2.0).round() as u32).min(height);
        paint_rect(&mut pixels, width, (x0, y0), (x1, y1), SKIN_RGB);
    }

    // Dimensions are non-zero and the buffer is full-sized
    FrameSample {
        width,
        height,
        pixels,
        captured_at: Instant::now(),
    }
}

/// Fill the half-open rectangle [x0, x1) × [y0, y1) with `rgb`
pub fn paint_rect(pixels: &mut [u8], width: u32, (x0, y0): (u32, u32), (x1, y1): (u32, u32), rgb: [u8; 3]) {
    for y in y0..y1 {
        for x in x0..x1 {
            let offset = (y as usize * width as usize + x as usize) * RGBA_CHANNELS;
            pixels[offset..offset + 3].copy_from_slice(&rgb);
        }
    }
}

/// Builder for [`SyntheticBackend`]
#[derive(Default)]
pub struct SyntheticBackendBuilder {
    devices: Vec<DeviceDescriptor>,
    deny_enumeration: bool,
    open_failure: Option<PlatformMediaError>,
    release_failure: bool,
    frame_size: Option<(u32, u32)>,
    warmup_frames: usize,
    script: Option<FaceScript>,
}

impl SyntheticBackendBuilder {
    pub fn device(mut self, id: &str, label: &str) -> Self {
        self.devices.push(DeviceDescriptor::video(id, label));
        self
    }

    pub fn audio_device(mut self, id: &str, label: &str) -> Self {
        self.devices.push(DeviceDescriptor {
            id: DeviceId::new(id),
            label: label.to_string(),
            kind: DeviceKind::Audio,
        });
        self
    }

    pub fn deny_enumeration(mut self) -> Self {
        self.deny_enumeration = true;
        self
    }

    pub fn fail_open(mut self, error: PlatformMediaError) -> Self {
        self.open_failure = Some(error);
        self
    }

    pub fn fail_release(mut self) -> Self {
        self.release_failure = true;
        self
    }

    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Number of initial frame pulls that report no frame
    pub fn warmup_frames(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }

    pub fn script(mut self, script: FaceScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn build(self) -> SyntheticBackend {
        SyntheticBackend {
            devices: self.devices,
            deny_enumeration: self.deny_enumeration,
            open_failure: self.open_failure,
            release_failure: self.release_failure,
            frame_size: self.frame_size.unwrap_or((320, 240)),
            warmup_frames: self.warmup_frames,
            script: self.script.unwrap_or(FaceScript::Fixed(0.0)),
            open_devices: Arc::new(Mutex::new(HashSet::new())),
            recording_slot: RecordingSlot::new(),
        }
    }
}

/// A fake camera backend for running without real hardware.
pub struct SyntheticBackend {
    devices: Vec<DeviceDescriptor>,
    deny_enumeration: bool,
    open_failure: Option<PlatformMediaError>,
    release_failure: bool,
    frame_size: (u32, u32),
    warmup_frames: usize,
    script: FaceScript,
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
    /// Shared by every stream of this backend
    recording_slot: RecordingSlot,
}

impl SyntheticBackend {
    pub fn builder() -> SyntheticBackendBuilder {
        SyntheticBackendBuilder::default()
    }

    /// A front and a back camera with the sweep script, as used by `--synthetic`
    pub fn demo() -> Self {
        Self::builder()
            .device("synthetic:front", "Synthetic Front Camera")
            .device("synthetic:back", "Synthetic Back Camera")
            .warmup_frames(3)
            .script(FaceScript::Sweep {
                dwell: Duration::from_millis(800),
            })
            .build()
    }

    /// Number of streams currently holding a device
    pub fn open_stream_count(&self) -> usize {
        self.open_devices.lock().len()
    }
}

#[async_trait]
impl CameraBackend for SyntheticBackend {
    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        if self.deny_enumeration {
            return Err(CameraError::DeviceEnumeration("enumeration not permitted".to_string()));
        }
        Ok(self.devices.clone())
    }

    async fn open_stream(
        &self,
        device: &DeviceId,
        _constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>> {
        if let Some(failure) = &self.open_failure {
            return Err(CameraError::from_platform(failure.clone(), device.as_str()));
        }

        let known = self
            .devices
            .iter()
            .any(|d| &d.id == device && d.kind == DeviceKind::Video);
        if !known {
            return Err(CameraError::from_platform(PlatformMediaError::NotFound, device.as_str()));
        }

        if !self.open_devices.lock().insert(device.clone()) {
            return Err(CameraError::from_platform(PlatformMediaError::Busy, device.as_str()));
        }

        let (width, height) = self.frame_size;
        tracing::debug!("Synthetic stream opened on {} ({}x{})", device, width, height);

        Ok(Arc::new(SyntheticStream {
            device: device.clone(),
            width,
            height,
            script: self.script.clone(),
            warmup_frames: self.warmup_frames,
            opened_at: Instant::now(),
            pulls: AtomicUsize::new(0),
            live: AtomicBool::new(true),
            release_failure: self.release_failure,
            open_devices: self.open_devices.clone(),
            recording_slot: self.recording_slot.clone(),
        }))
    }
}

/// Stream produced by [`SyntheticBackend`]
pub struct SyntheticStream {
    device: DeviceId,
    width: u32,
    height: u32,
    script: FaceScript,
    warmup_frames: usize,
    opened_at: Instant,
    pulls: AtomicUsize,
    live: AtomicBool,
    release_failure: bool,
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
    recording_slot: RecordingSlot,
}

impl SyntheticStream {
    fn face_offset(&self, pull: usize) -> Option<f64> {
        match &self.script {
            FaceScript::Absent => None,
            FaceScript::Fixed(x) => Some(*x),
            FaceScript::Sweep { dwell } => {
                let dwell_ms = dwell.as_millis().max(1);
                let phase = (self.opened_at.elapsed().as_millis() / dwell_ms) % 3;
                Some(match phase {
                    0 => 0.0,
                    1 => SWEEP_OFFSET,
                    _ => -SWEEP_OFFSET,
                })
            }
            FaceScript::Positions(positions) if positions.is_empty() => None,
            FaceScript::Positions(positions) => positions[pull % positions.len()],
        }
    }
}

impl FrameSource for SyntheticStream {
    fn current_frame(&self) -> Option<FrameSample> {
        if !self.live.load(Ordering::SeqCst) {
            return None;
        }
        let pull = self.pulls.fetch_add(1, Ordering::SeqCst);
        if pull < self.warmup_frames {
            return None;
        }
        let offset = self.face_offset(pull - self.warmup_frames);
        Some(render_face_frame(self.width, self.height, offset.map(|x| (x, 0.0))))
    }
}

impl VideoStream for SyntheticStream {
    fn device_id(&self) -> &DeviceId {
        &self.device
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live.load(Ordering::SeqCst))
    }

    fn stop(&self) -> Result<()> {
        if self.live.swap(false, Ordering::SeqCst) {
            self.open_devices.lock().remove(&self.device);
            tracing::debug!("Synthetic stream on {} stopped", self.device);
            if self.release_failure {
                return Err(CameraError::Release("synthetic release failure".to_string()));
            }
        }
        Ok(())
    }

    fn recording_slot(&self) -> RecordingSlot {
        self.recording_slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_places_face_at_offset() {
        let frame = render_face_frame(100, 100, Some((0.5, 0.0)));
        // Face centre at x = 75
        assert_eq!(frame.rgba(75, 50)[..3], SKIN_RGB);
        assert_eq!(frame.rgba(10, 50)[..3], BACKGROUND_RGB);
    }

    #[test]
    fn test_render_without_face_is_background_only() {
        let frame = render_face_frame(8, 8, None);
        assert!(frame
            .pixels
            .chunks(4)
            .all(|p| p[..3] == BACKGROUND_RGB));
    }

    #[tokio::test]
    async fn test_warmup_frames_yield_nothing() {
        let backend = SyntheticBackend::builder().device("cam", "cam").warmup_frames(2).build();
        let stream = backend
            .open_stream(&DeviceId::new("cam"), &StreamConstraints::default())
            .await
            .unwrap();
        assert!(stream.current_frame().is_none());
        assert!(stream.current_frame().is_none());
        assert!(stream.current_frame().is_some());
    }

    #[tokio::test]
    async fn test_second_stream_on_same_device_is_busy() {
        let backend = SyntheticBackend::builder().device("cam", "cam").build();
        let id = DeviceId::new("cam");
        let first = backend.open_stream(&id, &StreamConstraints::default()).await.unwrap();
        let second = backend.open_stream(&id, &StreamConstraints::default()).await;
        assert!(matches!(second, Err(CameraError::DeviceBusy(_))));

        first.stop().unwrap();
        assert_eq!(backend.open_stream_count(), 0);
        assert!(backend.open_stream(&id, &StreamConstraints::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let backend = SyntheticBackend::builder().device("cam", "cam").build();
        let result = backend
            .open_stream(&DeviceId::new("other"), &StreamConstraints::default())
            .await;
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_stopped_stream_yields_no_frames() {
        let backend = SyntheticBackend::builder().device("cam", "cam").build();
        let stream = backend
            .open_stream(&DeviceId::new("cam"), &StreamConstraints::default())
            .await
            .unwrap();
        stream.stop().unwrap();
        assert!(stream.current_frame().is_none());
        assert_eq!(stream.active_tracks(), 0);
    }
}
