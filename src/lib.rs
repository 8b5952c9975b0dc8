//! Liveness capture
//!
//! Guided head-rotation liveness recording: camera session ownership, frame
//! sampling, a heuristic face locator, head pose classification, rotation
//! progress and the recording lifecycle, plus the multipart submission
//! mapping for the resulting artifacts.

pub mod analysis;
pub mod capture;
pub mod liveness;
pub mod recorder;
pub mod submission;
pub mod utils;

pub use liveness::{begin_liveness_capture, DeviceSelection, LivenessConfig, LivenessSession};
pub use utils::error::{ErrorResponse, LivenessError, LivenessResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liveness_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting liveness-capture v{}", env!("CARGO_PKG_VERSION"));
    }
}
