//! Reading normalization
//!
//! Turns a raw provider fix into a fixed-shape `Reading`.
//!
//! Fields the provider did not populate become `0.0`. This is a lossy default:
//! a consumer cannot tell an absent altitude/accuracy/speed/bearing from a true
//! zero.
//!
//! Timestamps come from the fix's monotonic boot-relative clock when the
//! platform exposes one. Otherwise the wall-clock time is scaled to
//! nanoseconds; such readings are flagged `TimestampOrigin::WallClockApprox`
//! and are not synchronized with other sensors.

use crate::capture::traits::RawLocation;
use serde::{Deserialize, Serialize};

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Where a reading's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampOrigin {
    /// Monotonic boot-relative clock, shared with other sensors
    Monotonic,
    /// Wall-clock milliseconds scaled to nanoseconds (approximate)
    WallClockApprox,
}

/// One normalized position sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub accuracy: f32,
    pub speed: f32,
    pub bearing: f32,
    pub timestamp_ns: i64,
    pub timestamp_origin: TimestampOrigin,
}

/// Normalize a raw fix. Never fails.
pub fn normalize(raw: &RawLocation) -> Reading {
    let (timestamp_ns, timestamp_origin) = match raw.elapsed_realtime_nanos {
        Some(nanos) => (nanos, TimestampOrigin::Monotonic),
        None => (
            raw.time_ms.saturating_mul(NANOS_PER_MILLI),
            TimestampOrigin::WallClockApprox,
        ),
    };

    Reading {
        latitude: raw.latitude,
        longitude: raw.longitude,
        altitude: raw.altitude.unwrap_or(0.0),
        accuracy: raw.accuracy.unwrap_or(0.0),
        speed: raw.speed.unwrap_or(0.0),
        bearing: raw.bearing.unwrap_or(0.0),
        timestamp_ns,
        timestamp_origin,
    }
}
