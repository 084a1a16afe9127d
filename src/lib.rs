//! GPS Sensor Logger - time-synchronized GPS recording for capture sessions.
//!
//! Subscribes to redundant location providers, normalizes their fixes and
//! writes them as CSV stamped from the same monotonic clock the other sensors
//! of a capture session use.

pub mod capture;
pub mod recorder;
pub mod utils;

pub use capture::{LocalStorage, LoopbackLocationService, ProviderId, RawLocation};
pub use recorder::{
    Collaborators, MonotonicClock, OutputLocator, RecorderEvent, RecordingSession,
    RecordingState, RecordingSummary,
};
pub use utils::{LoggerError, LoggerResult, RecorderConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
///
/// Reads `RUST_LOG`, defaulting to debug output for this crate. Does nothing
/// if a global subscriber is already installed.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gps_sensor_logger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting GPS Sensor Logger v{}", env!("CARGO_PKG_VERSION"));
    }
}
