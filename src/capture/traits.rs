//! Collaborator trait definitions
//!
//! Platform-agnostic contracts for the pieces this crate does not own:
//! location permission, provider availability, location delivery and
//! output storage resolution.

use crate::utils::error::LoggerResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Identifies one of the redundant location providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Satellite-based provider
    Primary,
    /// Network-based provider, used as a fallback/supplement
    Secondary,
}

impl ProviderId {
    /// Subscription order: primary first
    pub const ALL: [ProviderId; 2] = [ProviderId::Primary, ProviderId::Secondary];

    /// Platform name of the provider
    pub fn name(&self) -> &'static str {
        match self {
            ProviderId::Primary => "gps",
            ProviderId::Secondary => "network",
        }
    }

    /// Parse a platform provider name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gps" => Some(ProviderId::Primary),
            "network" => Some(ProviderId::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability status reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderStatus {
    OutOfService,
    TemporarilyUnavailable,
    Available,
    /// Status code the platform reported that has no known meaning
    Unknown(i32),
}

impl ProviderStatus {
    /// Map a platform status code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ProviderStatus::OutOfService,
            1 => ProviderStatus::TemporarilyUnavailable,
            2 => ProviderStatus::Available,
            other => ProviderStatus::Unknown(other),
        }
    }
}

/// A position fix as delivered by the platform, before normalization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,

    /// Altitude in meters, if the provider populated it
    pub altitude: Option<f64>,

    /// Horizontal accuracy in meters, if populated
    pub accuracy: Option<f32>,

    /// Ground speed in m/s, if populated
    pub speed: Option<f32>,

    /// Bearing in degrees, if populated
    pub bearing: Option<f32>,

    /// Wall-clock fix time in Unix milliseconds
    pub time_ms: i64,

    /// Monotonic boot-relative fix time, if the platform exposes one
    pub elapsed_realtime_nanos: Option<i64>,
}

impl RawLocation {
    /// Create a fix with only a position and wall-clock time
    pub fn new(latitude: f64, longitude: f64, time_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            time_ms,
            ..Self::default()
        }
    }

    /// Whether the fix carries a usable position
    pub fn has_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Everything a provider can report to its listener
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    StatusChanged(ProviderStatus),
    ProviderEnabled,
    ProviderDisabled,
    /// A position fix; `None` when the platform delivered a null location
    ReadingReceived(Option<RawLocation>),
}

/// Cadence requested from a provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    pub min_interval: Duration,
    pub min_distance_m: f32,
}

/// Receives the events of a single provider registration
pub trait LocationListener: Send + Sync {
    fn on_event(&self, event: LocationEvent);
}

/// Reports whether location access has been granted
pub trait LocationAuthorizer: Send + Sync {
    fn has_location_permission(&self) -> bool;
}

/// Reports which providers exist on this device
pub trait ProviderCatalog: Send + Sync {
    fn supported_providers(&self) -> HashSet<ProviderId>;
}

/// Platform location delivery
pub trait LocationService: Send + Sync {
    /// Register `listener` for updates from `provider`.
    ///
    /// Fails with `LoggerError::Unauthorized` if permission was revoked.
    fn request_updates(
        &self,
        provider: ProviderId,
        request: UpdateRequest,
        listener: Arc<dyn LocationListener>,
    ) -> LoggerResult<()>;

    /// Remove the registration for `provider`
    fn remove_updates(&self, provider: ProviderId) -> LoggerResult<()>;
}

/// Logical category of a capture output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaCategory {
    RawSensorInfo,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::RawSensorInfo => "raw-sensor-info",
        }
    }
}

/// Request for a new capture output file
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRequest {
    pub category: MediaCategory,
    pub sensor_name: String,
    pub extension: String,
    pub session_time: DateTime<Utc>,
}

/// Where the storage collaborator placed a new output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A concrete writable filesystem path
    File(PathBuf),
    /// A permission-scoped content URI
    ScopedUri(String),
}

/// Media index flags passed along with a new-file announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceFlags {
    pub new_picture: bool,
    pub new_video: bool,
    pub set_last_scanned: bool,
}

impl AnnounceFlags {
    /// Raw sensor info written to a direct path
    pub fn direct_raw_sensor() -> Self {
        Self::default()
    }

    /// Raw sensor info written through a scoped URI
    pub fn scoped_raw_sensor() -> Self {
        Self {
            new_picture: true,
            new_video: false,
            set_last_scanned: true,
        }
    }
}

/// Resolves logical output requests into writable handles
pub trait StorageResolver: Send + Sync {
    /// Create a new output location for `request`
    fn create_output(&self, request: &OutputRequest) -> LoggerResult<OutputTarget>;

    /// Open a scoped URI for writing. `Ok(None)` means no usable descriptor.
    fn open_uri_for_write(&self, uri: &str) -> LoggerResult<Option<Box<dyn Write + Send>>>;

    /// Map a scoped URI back to a concrete file, if possible
    fn resolve_uri_to_file(&self, uri: &str) -> Option<PathBuf>;

    /// Tell the OS media index a new artifact exists
    fn announce_new_file(&self, file: &Path, flags: AnnounceFlags);

    /// Remove an output that was created but never opened for writing
    fn discard_output(&self, target: &OutputTarget) {
        let file = match target {
            OutputTarget::File(path) => Some(path.clone()),
            OutputTarget::ScopedUri(uri) => self.resolve_uri_to_file(uri),
        };
        match file {
            Some(file) => {
                if let Err(e) = std::fs::remove_file(&file) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!("Failed to remove unused output {:?}: {}", file, e);
                    }
                }
            }
            None => tracing::warn!("Cannot locate unused output {:?} to remove it", target),
        }
    }
}
