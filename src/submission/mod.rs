//! Submission boundary
//!
//! The multipart field mapping for captured artifacts and an on-disk bundle
//! of the same content. The HTTP request itself is not made here.

pub mod bundle;
pub mod form;

pub use bundle::{read_manifest, write_bundle, BundleError, Manifest, ManifestEntry};
pub use form::{ApplicantFields, FormPart, PartValue, SubmissionForm};
