//! ID document photos
//!
//! Front and back photos of the national card are single stills taken with
//! their own short-lived camera session, before the liveness recording.

use crate::capture::frame::wait_for_frame;
use crate::capture::still::still_artifact;
use crate::capture::{Artifact, ArtifactKind, CameraBackend, CameraSession, DeviceId, DocumentPhotos, StreamConstraints};
use crate::utils::error::{LivenessError, LivenessResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            DocumentSide::Front => ArtifactKind::FrontIdPhoto,
            DocumentSide::Back => ArtifactKind::BackIdPhoto,
        }
    }
}

/// Open `device`, take one still of the document and release the camera
pub async fn capture_document_photo(
    backend: Arc<dyn CameraBackend>,
    device: &DeviceId,
    constraints: &StreamConstraints,
    side: DocumentSide,
    warmup_timeout: Duration,
) -> LivenessResult<Artifact> {
    let mut camera = CameraSession::new(backend);
    let stream = camera.open(device, constraints).await?;

    let result = match wait_for_frame(stream.as_ref(), warmup_timeout).await {
        Some(frame) => still_artifact(&frame, side.artifact_kind()).map_err(LivenessError::from),
        None => Err(LivenessError::NoFrame(device.to_string())),
    };

    camera.close();
    if let Ok(photo) = &result {
        tracing::info!("Captured {:?} document photo ({} bytes)", side, photo.len());
    }
    result
}

/// Front then back photo on the same device
pub async fn capture_documents(
    backend: Arc<dyn CameraBackend>,
    device: &DeviceId,
    constraints: &StreamConstraints,
    warmup_timeout: Duration,
) -> LivenessResult<DocumentPhotos> {
    let front = capture_document_photo(
        backend.clone(),
        device,
        constraints,
        DocumentSide::Front,
        warmup_timeout,
    )
    .await?;
    let back = capture_document_photo(backend, device, constraints, DocumentSide::Back, warmup_timeout).await?;
    Ok(DocumentPhotos { front, back })
}
