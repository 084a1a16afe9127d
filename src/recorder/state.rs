//! Recording state management
//!
//! Defines the session state machine and the per-recording bookkeeping.

use super::reading::{Reading, TimestampOrigin};
use super::sink::OutputLocator;
use crate::capture::traits::ProviderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Providers not subscribed
    #[default]
    Idle,
    /// Providers subscribed, readings are dropped
    Listening,
    /// Readings are written to the open output
    Recording,
    /// A recording ended; providers are still subscribed
    Stopped,
}

impl RecordingState {
    /// Whether `start_recording` may be called from this state
    pub fn can_start(self) -> bool {
        matches!(
            self,
            RecordingState::Listening | RecordingState::Recording | RecordingState::Stopped
        )
    }
}

/// Running counters for one recording window
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RecordingStats {
    pub lines_written: u64,
    pub primary_readings: u64,
    pub secondary_readings: u64,
    pub first_timestamp_ns: Option<i64>,
    pub last_timestamp_ns: Option<i64>,
    pub out_of_order: u64,
    pub approximate_timestamps: u64,
    pub write_failures: u64,
}

impl RecordingStats {
    /// Account for a line that was written.
    ///
    /// Returns true when the reading's timestamp went backwards.
    pub fn record(&mut self, provider: ProviderId, reading: &Reading) -> bool {
        self.lines_written += 1;
        match provider {
            ProviderId::Primary => self.primary_readings += 1,
            ProviderId::Secondary => self.secondary_readings += 1,
        }
        if reading.timestamp_origin == TimestampOrigin::WallClockApprox {
            self.approximate_timestamps += 1;
        }

        let regressed = self
            .last_timestamp_ns
            .is_some_and(|last| reading.timestamp_ns < last);
        if regressed {
            self.out_of_order += 1;
        } else {
            self.last_timestamp_ns = Some(reading.timestamp_ns);
        }
        self.first_timestamp_ns.get_or_insert(reading.timestamp_ns);
        regressed
    }
}

/// Result of a completed recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    /// Correlation id of the recording
    pub recording_id: Uuid,

    /// Where the recording was written
    pub locator: OutputLocator,

    /// Data lines written (header excluded)
    pub lines_written: u64,

    pub primary_readings: u64,
    pub secondary_readings: u64,

    /// Timestamp of the first data line
    pub first_timestamp_ns: Option<i64>,

    /// Highest timestamp written
    pub last_timestamp_ns: Option<i64>,

    /// Lines whose timestamp was lower than an earlier line's
    pub out_of_order: u64,

    /// Whether any line used the approximate wall-clock timestamp
    pub has_approximate_timestamps: bool,

    /// Appends that failed and were skipped
    pub write_failures: u64,

    /// Shared clock value when the recording started
    pub started_at_ns: i64,

    /// Shared clock value when the recording stopped
    pub stopped_at_ns: i64,

    /// Whether the output was flushed and closed without error
    pub closed_cleanly: bool,
}

impl RecordingSummary {
    pub(crate) fn new(
        recording_id: Uuid,
        locator: OutputLocator,
        stats: &RecordingStats,
        started_at_ns: i64,
        stopped_at_ns: i64,
        closed_cleanly: bool,
    ) -> Self {
        Self {
            recording_id,
            locator,
            lines_written: stats.lines_written,
            primary_readings: stats.primary_readings,
            secondary_readings: stats.secondary_readings,
            first_timestamp_ns: stats.first_timestamp_ns,
            last_timestamp_ns: stats.last_timestamp_ns,
            out_of_order: stats.out_of_order,
            has_approximate_timestamps: stats.approximate_timestamps > 0,
            write_failures: stats.write_failures,
            started_at_ns,
            stopped_at_ns,
            closed_cleanly,
        }
    }

    /// Recording duration on the shared clock, in milliseconds
    pub fn duration_ms(&self) -> f64 {
        (self.stopped_at_ns - self.started_at_ns) as f64 / 1_000_000.0
    }
}
