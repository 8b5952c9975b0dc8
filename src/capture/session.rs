//! Camera session
//!
//! Owns acquisition and release of exactly one live video stream.

use super::error::{CameraError, Result};
use super::traits::{CameraBackend, DeviceDescriptor, DeviceId, DeviceKind, Facing, StreamConstraints, VideoStream};
use std::sync::Arc;

/// Exclusive owner of one camera stream
///
/// The stream is released on `close()` and, as a last resort, on drop.
pub struct CameraSession {
    backend: Arc<dyn CameraBackend>,
    stream: Option<Arc<dyn VideoStream>>,
}

impl CameraSession {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            stream: None,
        }
    }

    /// Video devices in platform order
    pub fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let devices = self.backend.enumerate_devices()?;
        let video: Vec<_> = devices
            .into_iter()
            .filter(|d| d.kind == DeviceKind::Video)
            .collect();
        tracing::debug!("Enumerated {} video devices", video.len());
        Ok(video)
    }

    /// Pick the device whose label best matches `desired`.
    ///
    /// Order: a label matching the desired facing, then (when asking for the
    /// front camera) one matching the back camera, then the first device.
    pub fn select_preferred(devices: &[DeviceDescriptor], desired: Facing) -> Option<&DeviceDescriptor> {
        let matches = |facing: Facing| {
            devices.iter().find(|device| {
                let label = device.label.to_lowercase();
                facing.keywords().iter().any(|k| label.contains(k))
            })
        };

        let fallback = match desired {
            Facing::Front => matches(desired.opposite()),
            Facing::Back => None,
        };

        matches(desired).or(fallback).or_else(|| devices.first())
    }

    /// Device after `current` in `devices`, wrapping around
    pub fn next_device<'a>(devices: &'a [DeviceDescriptor], current: &DeviceId) -> Option<&'a DeviceDescriptor> {
        if devices.len() <= 1 {
            return None;
        }
        let index = devices.iter().position(|d| &d.id == current).unwrap_or(0);
        devices.get((index + 1) % devices.len())
    }

    /// Acquire a live stream on `device`
    pub async fn open(
        &mut self,
        device: &DeviceId,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>> {
        if self.stream.is_some() {
            return Err(CameraError::SessionActive);
        }

        tracing::info!(
            "Opening camera {} ({}x{} @ {}fps)",
            device,
            constraints.resolution.width,
            constraints.resolution.height,
            constraints.frame_rate
        );

        let stream = self.backend.open_stream(device, constraints).await.map_err(|e| {
            tracing::error!("Failed to open camera {}: {}", device, e);
            e
        })?;

        self.stream = Some(stream.clone());
        Ok(stream)
    }

    /// The open stream, if any
    pub fn stream(&self) -> Option<&Arc<dyn VideoStream>> {
        self.stream.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the stream and all hardware tracks.
    ///
    /// Idempotent. Release failures are logged; the session is considered
    /// closed either way.
    pub fn close(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };

        match stream.stop() {
            Ok(()) => tracing::info!("Camera {} closed", stream.device_id()),
            Err(e) => tracing::warn!("Error releasing camera {}: {}", stream.device_id(), e),
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}
