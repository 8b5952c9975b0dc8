//! Native webcam backend using nokhwa
//!
//! Each open stream owns a capture thread that holds the camera and keeps
//! the most recent decoded RGBA frame available for the sampler and the
//! recorder.

use super::error::{CameraError, PlatformMediaError, Result};
use super::frame::FrameSample;
use super::traits::{CameraBackend, DeviceDescriptor, DeviceId, FrameSource, StreamConstraints, VideoStream};
use async_trait::async_trait;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Get camera index from a device id
fn camera_index(id: &DeviceId) -> CameraIndex {
    match id.as_str().parse::<u32>() {
        Ok(idx) => CameraIndex::Index(idx),
        Err(_) => CameraIndex::String(id.as_str().to_string()),
    }
}

/// Classify a nokhwa error by its message; nokhwa does not expose the
/// underlying OS error kind.
fn classify(error: &NokhwaError) -> PlatformMediaError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        PlatformMediaError::PermissionDenied
    } else if lower.contains("busy") || lower.contains("in use") {
        PlatformMediaError::Busy
    } else if lower.contains("not found") || lower.contains("no such") || lower.contains("no device") {
        PlatformMediaError::NotFound
    } else {
        PlatformMediaError::Other(message)
    }
}

/// Camera backend for real hardware
#[derive(Default)]
pub struct NativeBackend {
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CameraBackend for NativeBackend {
    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CameraError::DeviceEnumeration(e.to_string()))?;

        Ok(cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };
                DeviceDescriptor::video(id, info.human_name())
            })
            .collect())
    }

    async fn open_stream(
        &self,
        device: &DeviceId,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>> {
        if !self.open_devices.lock().insert(device.clone()) {
            return Err(CameraError::from_platform(PlatformMediaError::Busy, device.as_str()));
        }

        let latest: Arc<Mutex<Option<FrameSample>>> = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<std::result::Result<(), PlatformMediaError>>();

        let index = camera_index(device);
        let requested = nokhwa::utils::Resolution::new(
            constraints.resolution.width,
            constraints.resolution.height,
        );
        let thread_latest = latest.clone();
        let thread_running = running.clone();

        // The camera handle is not Send, so it lives entirely on this thread.
        let handle = std::thread::spawn(move || {
            let format = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::HighestResolution(requested));

            let mut camera = match Camera::new(index.clone(), format) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to open camera {:?}: {:?}", index, e);
                    let _ = ready_tx.send(Err(classify(&e)));
                    return;
                }
            };

            if let Err(e) = camera.open_stream() {
                tracing::error!("Failed to open camera stream: {:?}", e);
                let _ = ready_tx.send(Err(classify(&e)));
                return;
            }

            let camera_format = camera.camera_format();
            tracing::info!(
                "Webcam opened: {}x{} @ {}fps, format={:?}",
                camera_format.resolution().width(),
                camera_format.resolution().height(),
                camera_format.frame_rate(),
                camera_format.format()
            );
            let _ = ready_tx.send(Ok(()));

            while thread_running.load(Ordering::SeqCst) {
                // Blocks until the camera delivers the next frame
                match camera.frame() {
                    Ok(buffer) => match buffer.decode_image::<RgbAFormat>() {
                        Ok(image) => {
                            let (width, height) = (image.width(), image.height());
                            if let Some(frame) = FrameSample::new(width, height, image.into_raw()) {
                                *thread_latest.lock() = Some(frame);
                            }
                        }
                        Err(e) => tracing::debug!("Failed to decode frame: {:?}", e),
                    },
                    Err(e) => tracing::debug!("Failed to capture frame: {:?}", e),
                }
            }

            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {:?}", e);
            }
            tracing::info!("Webcam capture thread stopped");
        });

        let ready = ready_rx
            .await
            .unwrap_or_else(|_| Err(PlatformMediaError::Other("capture thread exited".to_string())));

        if let Err(e) = ready {
            let _ = handle.join();
            self.open_devices.lock().remove(device);
            return Err(CameraError::from_platform(e, device.as_str()));
        }

        Ok(Arc::new(NativeStream {
            device: device.clone(),
            latest,
            running,
            thread: Mutex::new(Some(handle)),
            open_devices: self.open_devices.clone(),
        }))
    }
}

/// Live stream backed by a nokhwa capture thread
pub struct NativeStream {
    device: DeviceId,
    latest: Arc<Mutex<Option<FrameSample>>>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    open_devices: Arc<Mutex<HashSet<DeviceId>>>,
}

impl FrameSource for NativeStream {
    fn current_frame(&self) -> Option<FrameSample> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        self.latest.lock().clone()
    }
}

impl VideoStream for NativeStream {
    fn device_id(&self) -> &DeviceId {
        &self.device
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.thread.lock().is_some())
    }

    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.thread.lock().take();
        self.latest.lock().take();
        self.open_devices.lock().remove(&self.device);

        // Wait for the thread so the camera light goes off before returning
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| CameraError::Release(format!("capture thread for {} panicked", self.device)))?;
        }
        Ok(())
    }
}
