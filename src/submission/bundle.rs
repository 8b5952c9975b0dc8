//! Submission bundle read/write operations
//!
//! A bundle is a directory holding everything one submission needs:
//! - one file per multipart file field, named as it would be uploaded
//! - manifest.json: field mapping, MIME types, sizes and applicant fields

use super::form::{ApplicantFields, PartValue, SubmissionForm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// Bundle-related errors
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("Missing required file: {0}")]
    MissingFile(String),
}

/// One artifact written to the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Multipart field name
    pub field: String,
    pub file_name: String,
    pub id: Uuid,
    pub mime_type: String,
    pub size: u64,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// In multipart order
    pub files: Vec<ManifestEntry>,
    pub fields: ApplicantFields,
}

/// Write every artifact of `form` plus a manifest into `bundle_path`
pub fn write_bundle(form: &SubmissionForm, bundle_path: &Path) -> Result<Manifest, BundleError> {
    if !bundle_path.exists() {
        fs::create_dir_all(bundle_path)?;
    }

    let mut files = Vec::new();
    for part in form.parts() {
        let PartValue::File(artifact) = part.value else {
            continue;
        };
        let file_name = artifact.file_name();
        fs::write(bundle_path.join(&file_name), artifact.data())?;
        files.push(ManifestEntry {
            field: part.name.to_string(),
            file_name,
            id: artifact.id,
            mime_type: artifact.mime_type.clone(),
            size: artifact.len() as u64,
            captured_at: artifact.captured_at,
        });
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        created_at: Utc::now(),
        files,
        fields: form.fields.clone(),
    };
    fs::write(
        bundle_path.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    tracing::info!(
        "Wrote submission bundle with {} files to {:?}",
        manifest.files.len(),
        bundle_path
    );
    Ok(manifest)
}

/// Read a bundle's manifest, checking that every listed file is present
pub fn read_manifest(bundle_path: &Path) -> Result<Manifest, BundleError> {
    if !bundle_path.is_dir() {
        return Err(BundleError::InvalidBundle(
            "Path is not a directory".to_string(),
        ));
    }

    let manifest_path = bundle_path.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(BundleError::MissingFile(MANIFEST_FILE.to_string()));
    }

    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
    if manifest.version > MANIFEST_VERSION {
        return Err(BundleError::InvalidBundle(format!(
            "unsupported manifest version {}",
            manifest.version
        )));
    }

    for entry in &manifest.files {
        let path = bundle_path.join(&entry.file_name);
        if !path.exists() {
            return Err(BundleError::MissingFile(entry.file_name.clone()));
        }
        let size = fs::metadata(&path)?.len();
        if size != entry.size {
            return Err(BundleError::InvalidBundle(format!(
                "{} is {} bytes, manifest says {}",
                entry.file_name, size, entry.size
            )));
        }
    }

    tracing::debug!("Loaded submission manifest from {:?}", bundle_path);
    Ok(manifest)
}

/// Check if a path holds a bundle manifest
pub fn is_valid_bundle(path: &Path) -> bool {
    path.is_dir() && path.join(MANIFEST_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::form::tests::sample_form;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_bundle() {
        let dir = tempdir().unwrap();
        let bundle_path = dir.path().join("submission");
        let form = sample_form();

        let written = write_bundle(&form, &bundle_path).unwrap();
        assert!(is_valid_bundle(&bundle_path));

        let fields: Vec<_> = written.files.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["nationalCard", "nationalCardBack", "selfVideo", "selfPhoto"]);
        assert_eq!(written.files[2].file_name, "self_video.webm");
        assert_eq!(written.files[2].size, 5);

        assert_eq!(
            fs::read(bundle_path.join("front_photo.png")).unwrap(),
            b"FRONT"
        );

        let read = read_manifest(&bundle_path).unwrap();
        assert_eq!(read, written);
        assert_eq!(read.fields.mobile, "09120000000");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        write_bundle(&sample_form(), dir.path()).unwrap();
        fs::remove_file(dir.path().join("self_photo.png")).unwrap();

        assert!(matches!(
            read_manifest(dir.path()),
            Err(BundleError::MissingFile(f)) if f == "self_photo.png"
        ));
    }

    #[test]
    fn test_truncated_file_is_reported() {
        let dir = tempdir().unwrap();
        write_bundle(&sample_form(), dir.path()).unwrap();
        fs::write(dir.path().join("self_video.webm"), b"VID").unwrap();

        assert!(matches!(
            read_manifest(dir.path()),
            Err(BundleError::InvalidBundle(_))
        ));
    }

    #[test]
    fn test_not_a_bundle() {
        let dir = tempdir().unwrap();
        assert!(!is_valid_bundle(dir.path()));
        assert!(matches!(
            read_manifest(dir.path()),
            Err(BundleError::MissingFile(_))
        ));
        assert!(matches!(
            read_manifest(&dir.path().join("nope")),
            Err(BundleError::InvalidBundle(_))
        ));
    }
}
