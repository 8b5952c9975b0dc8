//! Captured media artifacts
//!
//! Opaque, immutable references to captured photos and video handed off to
//! the caller. Cloning an artifact shares the underlying bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// What an artifact depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    FrontIdPhoto,
    BackIdPhoto,
    SelfPhoto,
    SelfVideo,
}

impl ArtifactKind {
    /// File stem used when the artifact is written or uploaded
    pub fn file_stem(&self) -> &'static str {
        match self {
            ArtifactKind::FrontIdPhoto => "front_photo",
            ArtifactKind::BackIdPhoto => "back_photo",
            ArtifactKind::SelfPhoto => "self_photo",
            ArtifactKind::SelfVideo => "self_video",
        }
    }
}

/// An immutable captured media blob
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: Uuid,
    pub kind: ArtifactKind,
    pub mime_type: String,
    pub captured_at: DateTime<Utc>,
    data: Arc<[u8]>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            mime_type: mime_type.into(),
            captured_at: Utc::now(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension derived from the MIME type
    pub fn extension(&self) -> &'static str {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            "video/x-raw-rgba" => "rgba",
            _ => "bin",
        }
    }

    /// e.g. `self_video.webm`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.kind.file_stem(), self.extension())
    }
}

/// Everything the liveness step hands back to the wizard
#[derive(Debug, Clone)]
pub struct CaptureArtifacts {
    pub front_id_photo: Artifact,
    pub back_id_photo: Artifact,
    pub self_photo: Artifact,
    pub video: Artifact,
}

/// Identity-document stills captured before the liveness step
#[derive(Debug, Clone)]
pub struct DocumentPhotos {
    pub front: Artifact,
    pub back: Artifact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_follow_kind_and_mime() {
        let video = Artifact::new(ArtifactKind::SelfVideo, "video/webm;codecs=vp9", vec![1, 2]);
        assert_eq!(video.file_name(), "self_video.webm");

        let photo = Artifact::new(ArtifactKind::FrontIdPhoto, "image/png", vec![]);
        assert_eq!(photo.file_name(), "front_photo.png");
        assert!(photo.is_empty());

        let odd = Artifact::new(ArtifactKind::SelfPhoto, "application/x-whatever", vec![0]);
        assert_eq!(odd.file_name(), "self_photo.bin");
    }

    #[test]
    fn test_clones_share_bytes() {
        let a = Artifact::new(ArtifactKind::SelfVideo, "video/webm", vec![7; 1024]);
        let b = a.clone();
        assert_eq!(a.id, b.id);
        assert_eq!(a.data().as_ptr(), b.data().as_ptr());
    }
}
