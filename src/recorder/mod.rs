//! GPS recording pipeline
//!
//! - ProviderManager subscribes to the redundant location providers
//! - RecordingSession drives the state machine and owns the output sink
//! - normalize/format_reading turn raw fixes into CSV lines

pub mod clock;
pub mod csv;
pub mod provider;
pub mod reading;
pub mod session;
pub mod sink;
pub mod state;

pub use clock::{ClockSource, ManualClock, MonotonicClock};
pub use provider::{LocationIngest, ProviderManager};
pub use reading::{normalize, Reading, TimestampOrigin};
pub use session::{Collaborators, RecorderEvent, RecordingSession};
pub use sink::{DirectPathSink, OutputLocator, OutputSink, ScopedUriSink};
pub use state::{RecordingState, RecordingSummary};
