//! Liveness session
//!
//! Owns the camera, the recorder, the pose sampling loop and the rotation
//! progress for one guided head-rotation recording.

use super::config::LivenessConfig;
use crate::analysis::{
    FrameSampler, HeadPoseEstimate, PoseAnalyzer, RotationProgress, RotationProgressTracker, RotationPrompt,
};
use crate::capture::frame::wait_for_frame;
use crate::capture::{
    CameraBackend, CameraError, CameraSession, CaptureArtifacts, DeviceDescriptor, DeviceId, DocumentPhotos,
    Facing, StreamConstraints, VideoStream,
};
use crate::recorder::{Recorder, RecordingError, RecordingState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Which camera to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelection {
    /// Best label match for a facing, else the first camera
    Preferred(Facing),
    /// A specific device
    Device(DeviceId),
}

impl Default for DeviceSelection {
    fn default() -> Self {
        DeviceSelection::Preferred(Facing::Front)
    }
}

/// Open the selected camera and prepare a liveness session.
///
/// Recording does not start until [`LivenessSession::start_recording`].
pub async fn begin_liveness_capture(
    backend: Arc<dyn CameraBackend>,
    selection: DeviceSelection,
    documents: DocumentPhotos,
    config: LivenessConfig,
) -> Result<LivenessSession, CameraError> {
    let mut camera = CameraSession::new(backend);
    let devices = camera.list_devices()?;

    let device = match &selection {
        DeviceSelection::Preferred(facing) => CameraSession::select_preferred(&devices, *facing),
        DeviceSelection::Device(id) => devices.iter().find(|d| &d.id == id),
    }
    .cloned()
    .ok_or_else(|| match &selection {
        DeviceSelection::Device(id) => CameraError::DeviceNotFound(id.to_string()),
        DeviceSelection::Preferred(_) => CameraError::DeviceNotFound("no video input devices".to_string()),
    })?;

    let mut constraints = config.capture;
    if let DeviceSelection::Preferred(facing) = selection {
        constraints.facing = Some(facing);
    }

    let stream = camera.open(&device.id, &constraints).await?;
    tracing::info!("Liveness capture ready on {} ({})", device.label, device.id);

    let analyzer = PoseAnalyzer::skin_tone(config.locator, config.pose);
    Ok(LivenessSession {
        recorder: Recorder::new(config.recording.clone()),
        sampler: FrameSampler::new(config.sampling_interval()),
        tracker: Arc::new(Mutex::new(RotationProgressTracker::new())),
        latest_pose: Arc::new(Mutex::new(None)),
        analyzer: Arc::new(analyzer),
        camera,
        stream,
        device,
        constraints,
        documents,
        config,
    })
}

pub struct LivenessSession {
    config: LivenessConfig,
    camera: CameraSession,
    /// Stream of the current or last camera open
    stream: Arc<dyn VideoStream>,
    device: DeviceDescriptor,
    constraints: StreamConstraints,
    recorder: Recorder,
    sampler: FrameSampler,
    analyzer: Arc<PoseAnalyzer>,
    tracker: Arc<Mutex<RotationProgressTracker>>,
    latest_pose: Arc<Mutex<Option<HeadPoseEstimate>>>,
    documents: DocumentPhotos,
}

impl LivenessSession {
    /// Replace the pose analyzer, e.g. with a model-backed face locator
    pub fn with_analyzer(mut self, analyzer: PoseAnalyzer) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn documents(&self) -> &DocumentPhotos {
        &self.documents
    }

    pub fn progress(&self) -> RotationProgress {
        self.tracker.lock().progress()
    }

    pub fn prompt(&self) -> RotationPrompt {
        self.tracker.lock().prompt()
    }

    /// Pose from the most recent sampled frame
    pub fn latest_pose(&self) -> Option<HeadPoseEstimate> {
        *self.latest_pose.lock()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    /// Elapsed recording time against the soft cap, 0..=100
    pub fn recording_progress(&self) -> f64 {
        self.recorder.progress_percent()
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera.is_open()
    }

    /// Live tracks on the most recently opened stream
    pub fn active_tracks(&self) -> usize {
        self.stream.active_tracks()
    }

    /// Reopen the camera if an earlier stop released it
    async fn ensure_camera(&mut self) -> Result<(), RecordingError> {
        if self.camera.is_open() {
            return Ok(());
        }
        self.stream = self
            .camera
            .open(&self.device.id, &self.constraints)
            .await
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        Ok(())
    }

    /// Reset rotation progress, start recording and begin pose sampling
    pub async fn start_recording(&mut self) -> Result<(), RecordingError> {
        if self.recorder.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }
        self.ensure_camera().await?;

        if wait_for_frame(self.stream.as_ref(), self.config.warmup_timeout())
            .await
            .is_none()
        {
            return Err(RecordingError::StartFailed(format!(
                "camera {} delivered no frame",
                self.device.id
            )));
        }

        self.tracker.lock().reset();
        *self.latest_pose.lock() = None;
        self.recorder.start(self.stream.clone())?;

        let analyzer = self.analyzer.clone();
        let tracker = self.tracker.clone();
        let latest_pose = self.latest_pose.clone();
        self.sampler.start(self.stream.clone(), move |frame| {
            let pose = analyzer.analyze(frame);
            tracker.lock().update(&pose);
            *latest_pose.lock() = Some(pose);
        });

        Ok(())
    }

    /// Discard the current recording and start over with fresh progress
    pub async fn restart_recording(&mut self) -> Result<(), RecordingError> {
        tracing::info!("Restarting liveness recording");
        self.sampler.stop();
        self.recorder.discard().await;
        self.start_recording().await
    }

    /// Stop sampling, finalize the video and release the camera
    pub async fn stop_recording(&mut self) -> Result<CaptureArtifacts, RecordingError> {
        if !self.recorder.is_recording() {
            return Err(RecordingError::NotRecording);
        }

        self.sampler.stop();
        let video = self.recorder.stop().await;
        self.camera.close();

        let video = video?.ok_or(RecordingError::NotRecording)?;
        let self_photo = self
            .recorder
            .self_photo()
            .cloned()
            .ok_or(RecordingError::SelfPhotoMissing)?;

        let progress = self.progress();
        tracing::info!(
            "Liveness recording finished: {} bytes, rotations {}/3",
            video.len(),
            progress.reached()
        );

        Ok(CaptureArtifacts {
            front_id_photo: self.documents.front.clone(),
            back_id_photo: self.documents.back.clone(),
            self_photo,
            video,
        })
    }

    /// Switch to the next camera in the device list
    pub async fn switch_camera(&mut self) -> Result<&DeviceDescriptor, CameraError> {
        if self.recorder.is_recording() {
            return Err(CameraError::SessionActive);
        }

        let devices = self.camera.list_devices()?;
        let next = CameraSession::next_device(&devices, &self.device.id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound("no video input devices".to_string()))?;

        self.camera.close();
        self.stream = self.camera.open(&next.id, &self.constraints).await?;
        tracing::info!("Switched camera to {} ({})", next.label, next.id);
        self.device = next;
        Ok(&self.device)
    }

    /// Stop sampling, drop any recording and release the camera.
    ///
    /// Each step runs regardless of the others.
    pub fn cancel(&mut self) {
        self.sampler.stop();
        self.recorder.cancel();
        self.camera.close();
    }
}

impl Drop for LivenessSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FaceCandidate, FaceLocator, HeadPoseEstimator};
    use crate::analysis::face_locator::{BoundingBox, Point};
    use crate::capture::{Artifact, ArtifactKind, FaceScript, FrameSample, PlatformMediaError, SyntheticBackend};
    use std::time::Duration;

    fn documents() -> DocumentPhotos {
        DocumentPhotos {
            front: Artifact::new(ArtifactKind::FrontIdPhoto, "image/png", vec![1]),
            back: Artifact::new(ArtifactKind::BackIdPhoto, "image/png", vec![2]),
        }
    }

    fn config() -> LivenessConfig {
        let mut config = LivenessConfig {
            sampling_interval_ms: 10,
            warmup_timeout_ms: 1000,
            ..Default::default()
        };
        config.recording.frame_rate = 10;
        config
    }

    fn sweep_backend() -> Arc<SyntheticBackend> {
        Arc::new(
            SyntheticBackend::builder()
                .device("back", "Back Camera")
                .device("front", "Front Camera")
                .frame_size(160, 120)
                .warmup_frames(2)
                .script(FaceScript::Sweep {
                    dwell: Duration::from_millis(60),
                })
                .build(),
        )
    }

    async fn wait_until_complete(session: &LivenessSession) -> bool {
        for _ in 0..300 {
            if session.progress().complete() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_full_capture_flow() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend.clone(), DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        assert_eq!(session.device().id, DeviceId::new("front"));
        assert_eq!(session.progress(), RotationProgress::default());
        assert_eq!(session.prompt(), RotationPrompt::Center);

        session.start_recording().await.unwrap();
        assert_eq!(session.recording_state(), RecordingState::Recording);
        assert!(wait_until_complete(&session).await);
        assert_eq!(session.prompt(), RotationPrompt::Complete);
        assert!(session.latest_pose().is_some());

        let artifacts = session.stop_recording().await.unwrap();
        assert_eq!(artifacts.front_id_photo.kind, ArtifactKind::FrontIdPhoto);
        assert_eq!(artifacts.back_id_photo.kind, ArtifactKind::BackIdPhoto);
        assert_eq!(artifacts.self_photo.kind, ArtifactKind::SelfPhoto);
        assert_eq!(artifacts.video.kind, ArtifactKind::SelfVideo);
        assert!(!artifacts.video.is_empty());

        assert_eq!(session.recording_state(), RecordingState::Stopped);
        assert!(!session.is_camera_open());
        assert_eq!(session.active_tracks(), 0);
        assert_eq!(backend.open_stream_count(), 0);
        // Progress survives stop
        assert!(session.progress().complete());
    }

    #[tokio::test]
    async fn test_cancel_releases_everything() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend.clone(), DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        session.start_recording().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        session.cancel();
        assert_eq!(session.active_tracks(), 0);
        assert_eq!(session.recording_state(), RecordingState::Idle);
        assert_eq!(backend.open_stream_count(), 0);
        assert!(matches!(
            session.stop_recording().await,
            Err(RecordingError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn test_cancel_continues_after_release_failure() {
        let backend = Arc::new(
            SyntheticBackend::builder()
                .device("front", "Front Camera")
                .frame_size(160, 120)
                .fail_release()
                .build(),
        );
        let mut session = begin_liveness_capture(backend.clone(), DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        session.start_recording().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        session.cancel();
        assert_eq!(session.active_tracks(), 0);
        assert!(!session.is_camera_open());
        assert_eq!(session.recording_state(), RecordingState::Idle);
        assert_eq!(backend.open_stream_count(), 0);

        // A failed release does not leave the recording slot taken
        session.start_recording().await.unwrap();
        assert_eq!(session.recording_state(), RecordingState::Recording);
        session.cancel();
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_second_session_cannot_record_concurrently() {
        let backend = sweep_backend();
        let mut front = begin_liveness_capture(
            backend.clone(),
            DeviceSelection::Device(DeviceId::new("front")),
            documents(),
            config(),
        )
        .await
        .unwrap();
        let mut back = begin_liveness_capture(
            backend.clone(),
            DeviceSelection::Device(DeviceId::new("back")),
            documents(),
            config(),
        )
        .await
        .unwrap();

        front.start_recording().await.unwrap();
        let err = back.start_recording().await.unwrap_err();
        assert!(matches!(err, RecordingError::AlreadyRecording));
        assert_eq!(back.recording_state(), RecordingState::Idle);
        assert_eq!(front.recording_state(), RecordingState::Recording);

        front.stop_recording().await.unwrap();
        back.start_recording().await.unwrap();
        assert!(back.stop_recording().await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_releases_camera() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend.clone(), DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        session.start_recording().await.unwrap();
        assert_eq!(backend.open_stream_count(), 1);

        drop(session);
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let backend = Arc::new(
            SyntheticBackend::builder()
                .device("front", "Front Camera")
                .fail_open(PlatformMediaError::PermissionDenied)
                .build(),
        );
        let result = begin_liveness_capture(backend, DeviceSelection::default(), documents(), config()).await;
        assert!(matches!(result, Err(CameraError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_unknown_device_and_empty_list() {
        let backend = sweep_backend();
        let result = begin_liveness_capture(
            backend,
            DeviceSelection::Device(DeviceId::new("missing")),
            documents(),
            config(),
        )
        .await;
        assert!(matches!(result, Err(CameraError::DeviceNotFound(d)) if d == "missing"));

        let empty = Arc::new(SyntheticBackend::builder().audio_device("mic", "Microphone").build());
        let result = begin_liveness_capture(empty, DeviceSelection::default(), documents(), config()).await;
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend, DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        session.start_recording().await.unwrap();

        let err = session.start_recording().await.unwrap_err();
        assert!(matches!(err, RecordingError::AlreadyRecording));
        assert_eq!(session.recording_state(), RecordingState::Recording);
        assert!(session.stop_recording().await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_without_recording_keeps_camera() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend, DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        assert!(matches!(
            session.stop_recording().await,
            Err(RecordingError::NotRecording)
        ));
        assert!(session.is_camera_open());
    }

    #[tokio::test]
    async fn test_restart_resets_progress() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend, DeviceSelection::default(), documents(), config())
            .await
            .unwrap();
        session.start_recording().await.unwrap();
        assert!(wait_until_complete(&session).await);

        session.restart_recording().await.unwrap();
        // The new sampling loop has not ticked yet
        assert!(!session.progress().complete());
        assert_eq!(session.recording_state(), RecordingState::Recording);

        let artifacts = session.stop_recording().await.unwrap();
        assert_eq!(artifacts.video.kind, ArtifactKind::SelfVideo);

        // Recording again reopens the camera
        session.start_recording().await.unwrap();
        assert!(session.is_camera_open());
        session.cancel();
    }

    #[tokio::test]
    async fn test_switch_camera() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend.clone(), DeviceSelection::default(), documents(), config())
            .await
            .unwrap();

        let next = session.switch_camera().await.unwrap().id.clone();
        assert_eq!(next, DeviceId::new("back"));
        assert_eq!(backend.open_stream_count(), 1);

        session.start_recording().await.unwrap();
        assert!(matches!(session.switch_camera().await, Err(CameraError::SessionActive)));
    }

    struct AlwaysTurnedRight;

    impl FaceLocator for AlwaysTurnedRight {
        fn locate(&self, frame: &FrameSample) -> Option<FaceCandidate> {
            let x = frame.width as f64 * 0.1;
            let y = frame.height as f64 / 2.0;
            Some(FaceCandidate {
                bounding_box: BoundingBox {
                    top_left: Point { x: 0.0, y: 0.0 },
                    bottom_right: Point { x: x * 2.0, y: y * 2.0 },
                },
                centroid: Point { x, y },
                confidence: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn test_custom_locator() {
        let backend = sweep_backend();
        let mut session = begin_liveness_capture(backend, DeviceSelection::default(), documents(), config())
            .await
            .unwrap()
            .with_analyzer(PoseAnalyzer::new(Box::new(AlwaysTurnedRight), HeadPoseEstimator::default()));

        session.start_recording().await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let progress = session.progress();
        assert!(progress.right);
        assert!(!progress.left);
        assert!(!progress.center);
        session.cancel();
    }
}
