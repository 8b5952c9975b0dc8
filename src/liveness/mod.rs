//! Liveness capture
//!
//! The surface handed to the wizard: document photos, then one guided
//! recording session with head-rotation progress.

pub mod config;
pub mod documents;
pub mod session;

pub use config::{ConfigError, LivenessConfig};
pub use documents::{capture_document_photo, capture_documents, DocumentSide};
pub use session::{begin_liveness_capture, DeviceSelection, LivenessSession};
