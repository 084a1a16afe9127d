//! Recording session
//!
//! Ties provider subscriptions, normalization, serialization and the output
//! sink together behind the `Idle -> Listening -> Recording -> Stopped` state
//! machine.
//!
//! Provider callbacks and the public API both go through one mutex around the
//! session state, so two providers delivering at once never interleave partial
//! lines and a reading racing `stop_recording` is either written before the
//! sink closes or dropped.

use super::clock::ClockSource;
use super::csv::{format_reading, HEADER_LINE};
use super::provider::{LocationIngest, ProviderManager};
use super::reading::normalize;
use super::sink::{open_sink, OutputLocator, OutputSink};
use super::state::{RecordingState, RecordingStats, RecordingSummary};
use crate::capture::loopback::LoopbackLocationService;
use crate::capture::traits::{
    LocationAuthorizer, LocationEvent, LocationService, MediaCategory, OutputRequest,
    ProviderCatalog, ProviderId, ProviderStatus, RawLocation, StorageResolver,
};
use crate::utils::config::RecorderConfig;
use crate::utils::error::{LoggerError, LoggerResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the recorder
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// Providers subscribed
    Enabled,
    /// Providers unsubscribed and session reset
    Disabled,
    /// A new output was opened and recording began
    Started {
        recording_id: Uuid,
        locator: OutputLocator,
    },
    /// A recording window ended and its output was closed
    Stopped(RecordingSummary),
    ProviderStatus {
        provider: ProviderId,
        status: ProviderStatus,
    },
    ProviderEnabled(ProviderId),
    ProviderDisabled(ProviderId),
    /// A failure that did not end the recording
    Error(String),
}

/// External collaborators a session depends on
#[derive(Clone)]
pub struct Collaborators {
    pub location: Arc<dyn LocationService>,
    pub catalog: Arc<dyn ProviderCatalog>,
    pub authorizer: Arc<dyn LocationAuthorizer>,
    pub storage: Arc<dyn StorageResolver>,
    pub clock: Arc<dyn ClockSource>,
}

impl Collaborators {
    /// Use one loopback service for permission, availability and delivery
    pub fn loopback(
        service: Arc<LoopbackLocationService>,
        storage: Arc<dyn StorageResolver>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            location: service.clone(),
            catalog: service.clone(),
            authorizer: service,
            storage,
            clock,
        }
    }
}

/// An open output and its bookkeeping
struct ActiveRecording {
    id: Uuid,
    sink: Box<dyn OutputSink>,
    started_at_ns: i64,
    stats: RecordingStats,
}

/// Mutable session fields, guarded together
#[derive(Default)]
struct SessionInner {
    state: RecordingState,
    active: Option<ActiveRecording>,
    last_locator: Option<OutputLocator>,
}

/// Shared half of the session; provider callbacks hold a reference to it
struct SessionCore {
    inner: Mutex<SessionInner>,
    storage: Arc<dyn StorageResolver>,
    clock: Arc<dyn ClockSource>,
    sensor_name: String,
    extension: String,
    write_buffer_capacity: usize,
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl SessionCore {
    fn emit(&self, event: RecorderEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    fn ingest_reading(&self, provider: ProviderId, raw: &RawLocation) {
        if !raw.has_position() {
            tracing::debug!("Dropping {} reading without a position", provider);
            return;
        }

        let mut inner = self.inner.lock();
        if inner.state != RecordingState::Recording {
            return;
        }
        let Some(active) = inner.active.as_mut() else {
            return;
        };

        let reading = normalize(raw);
        let line = format_reading(&reading);
        match active.sink.append(&line) {
            Ok(()) => {
                if active.stats.record(provider, &reading) {
                    tracing::warn!(
                        recording_id = %active.id,
                        "{} reading at {}ns is older than a previous line",
                        provider,
                        reading.timestamp_ns
                    );
                }
                tracing::debug!(
                    "GPS data recorded: provider={}, lat={}, lon={}, ts={}",
                    provider,
                    reading.latitude,
                    reading.longitude,
                    reading.timestamp_ns
                );
            }
            Err(e) => {
                active.stats.write_failures += 1;
                let message = format!("Failed to write {} reading: {}", provider, e);
                tracing::error!(recording_id = %active.id, "{}", message);
                drop(inner);
                self.emit(RecorderEvent::Error(message));
            }
        }
    }

    /// Flush and close a recording's output, producing its summary
    fn finish(&self, mut active: ActiveRecording) -> RecordingSummary {
        let closed_cleanly = match active.sink.flush_and_close() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    recording_id = %active.id,
                    "Failed to close GPS output {}: {}",
                    active.sink.locator(),
                    e
                );
                false
            }
        };

        let summary = RecordingSummary::new(
            active.id,
            active.sink.locator().clone(),
            &active.stats,
            active.started_at_ns,
            self.clock.now_ns(),
            closed_cleanly,
        );
        tracing::info!(
            recording_id = %summary.recording_id,
            "GPS recording stopped: {} lines to {}",
            summary.lines_written,
            summary.locator
        );
        summary
    }
}

impl LocationIngest for SessionCore {
    fn ingest(&self, provider: ProviderId, event: LocationEvent) {
        match event {
            LocationEvent::ReadingReceived(Some(raw)) => self.ingest_reading(provider, &raw),
            LocationEvent::ReadingReceived(None) => {
                tracing::debug!("Dropping null reading from {}", provider);
            }
            LocationEvent::StatusChanged(status) => {
                tracing::debug!("Provider status changed: provider={}, status={:?}", provider, status);
                self.emit(RecorderEvent::ProviderStatus { provider, status });
            }
            LocationEvent::ProviderEnabled => {
                tracing::debug!("Provider enabled: {}", provider);
                self.emit(RecorderEvent::ProviderEnabled(provider));
            }
            LocationEvent::ProviderDisabled => {
                tracing::debug!("Provider disabled: {}", provider);
                self.emit(RecorderEvent::ProviderDisabled(provider));
            }
        }
    }
}

/// GPS recording session.
///
/// One instance records to at most one output at a time. Dropping the session
/// disables it, which closes any open output.
pub struct RecordingSession {
    core: Arc<SessionCore>,
    providers: ProviderManager,
}

impl RecordingSession {
    /// Create an idle session
    pub fn new(config: RecorderConfig, collaborators: Collaborators) -> LoggerResult<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let providers = ProviderManager::new(
            collaborators.location,
            collaborators.catalog,
            collaborators.authorizer,
            &config,
        );
        let core = Arc::new(SessionCore {
            inner: Mutex::new(SessionInner::default()),
            storage: collaborators.storage,
            clock: collaborators.clock,
            sensor_name: config.sensor_name,
            extension: config.extension,
            write_buffer_capacity: config.write_buffer_capacity,
            event_tx,
        });

        Ok(Self { core, providers })
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.core.event_tx.subscribe()
    }

    pub fn state(&self) -> RecordingState {
        self.core.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Locator of the most recently opened output
    pub fn last_output_locator(&self) -> Option<OutputLocator> {
        self.core.inner.lock().last_locator.clone()
    }

    /// Providers currently subscribed
    pub fn active_providers(&self) -> Vec<ProviderId> {
        self.providers.active_providers()
    }

    /// Start listening to location providers.
    ///
    /// Returns `Ok(false)` when no provider is supported or permission is
    /// missing; the session then stays idle.
    pub fn enable(&self) -> LoggerResult<bool> {
        tracing::info!("Enabling GPS");

        let target: Arc<dyn LocationIngest> = self.core.clone();
        let enabled = self.providers.enable(target)?;
        if enabled {
            let mut inner = self.core.inner.lock();
            if inner.state == RecordingState::Idle {
                inner.state = RecordingState::Listening;
                drop(inner);
                self.core.emit(RecorderEvent::Enabled);
            }
        }
        Ok(enabled)
    }

    /// Unsubscribe from all providers and reset to idle.
    ///
    /// An open recording is stopped first. Safe to call repeatedly.
    pub fn disable(&self) {
        self.providers.disable();

        let (previous, active) = {
            let mut inner = self.core.inner.lock();
            let previous = inner.state;
            inner.state = RecordingState::Idle;
            (previous, inner.active.take())
        };

        if let Some(active) = active {
            let summary = self.core.finish(active);
            self.core.emit(RecorderEvent::Stopped(summary));
        }
        if previous != RecordingState::Idle {
            tracing::info!("GPS disabled");
            self.core.emit(RecorderEvent::Disabled);
        }
    }

    /// Open a new output named after `session_time` and start writing readings.
    ///
    /// If the output cannot be opened the state is left untouched and the
    /// error is returned. When already recording, the previous output is
    /// closed only after the new one is open.
    pub fn start_recording(&self, session_time: DateTime<Utc>) -> LoggerResult<OutputLocator> {
        let core = &self.core;
        let mut inner = core.inner.lock();
        if !inner.state.can_start() {
            return Err(LoggerError::NotListening(inner.state));
        }

        let recording_id = Uuid::new_v4();
        tracing::info!(%recording_id, "Starting GPS recording");

        let request = OutputRequest {
            category: MediaCategory::RawSensorInfo,
            sensor_name: core.sensor_name.clone(),
            extension: core.extension.clone(),
            session_time,
        };

        let opened = open_sink(core.storage.as_ref(), &request, core.write_buffer_capacity)
            .and_then(|mut sink| match sink.append(HEADER_LINE) {
                Ok(()) => Ok(sink),
                Err(e) => {
                    sink.abandon();
                    Err(LoggerError::OpenFailure(format!("failed to write header: {}", e)))
                }
            });
        let sink = match opened {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(%recording_id, "Failed to start GPS recording: {}", e);
                drop(inner);
                core.emit(RecorderEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let locator = sink.locator().clone();
        let previous = inner.active.replace(ActiveRecording {
            id: recording_id,
            sink,
            started_at_ns: core.clock.now_ns(),
            stats: RecordingStats::default(),
        });
        inner.state = RecordingState::Recording;
        inner.last_locator = Some(locator.clone());
        drop(inner);

        if let Some(previous) = previous {
            let summary = core.finish(previous);
            core.emit(RecorderEvent::Stopped(summary));
        }

        tracing::info!(%recording_id, "GPS recording started: {}", locator);
        core.emit(RecorderEvent::Started {
            recording_id,
            locator: locator.clone(),
        });
        Ok(locator)
    }

    /// Stop writing readings and close the output.
    ///
    /// Never fails: close errors are logged and reported in the summary.
    /// Returns `None` when no output was open.
    pub fn stop_recording(&self) -> Option<RecordingSummary> {
        let active = {
            let mut inner = self.core.inner.lock();
            match inner.state {
                RecordingState::Recording | RecordingState::Listening => {}
                other => {
                    tracing::debug!("stop_recording ignored in state {:?}", other);
                    return None;
                }
            }
            inner.state = RecordingState::Stopped;
            inner.active.take()
        };

        let summary = active.map(|active| self.core.finish(active));
        if let Some(summary) = &summary {
            self.core.emit(RecorderEvent::Stopped(summary.clone()));
        }
        summary
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.disable();
    }
}
