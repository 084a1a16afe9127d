//! In-process location service
//!
//! Implements the authorization, provider availability and location delivery
//! contracts without any platform behind them. The host (or a test) pushes
//! events in with `deliver`, and they reach whichever listener is registered
//! for that provider on the calling thread.

use super::traits::{
    LocationAuthorizer, LocationEvent, LocationListener, LocationService, ProviderCatalog,
    ProviderId, RawLocation, UpdateRequest,
};
use crate::recorder::clock::ClockSource;
use crate::utils::error::{LoggerError, LoggerResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Registration {
    request: UpdateRequest,
    listener: Arc<dyn LocationListener>,
}

/// Location service driven from inside the process
pub struct LoopbackLocationService {
    supported: Mutex<HashSet<ProviderId>>,
    permission: AtomicBool,
    /// Revoke permission after this many more successful subscriptions
    revoke_after: Mutex<Option<usize>>,
    registrations: Mutex<HashMap<ProviderId, Registration>>,
    clock: Arc<dyn ClockSource>,
}

impl LoopbackLocationService {
    /// Create a service offering `supported` providers, with permission granted
    pub fn new(supported: impl IntoIterator<Item = ProviderId>, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            supported: Mutex::new(supported.into_iter().collect()),
            permission: AtomicBool::new(true),
            revoke_after: Mutex::new(None),
            registrations: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn set_supported(&self, supported: impl IntoIterator<Item = ProviderId>) {
        *self.supported.lock() = supported.into_iter().collect();
    }

    /// Revoke permission once `successful` more subscriptions have gone through.
    ///
    /// Simulates permission being pulled between the check and the subscribe call.
    pub fn revoke_permission_after(&self, successful: usize) {
        *self.revoke_after.lock() = Some(successful);
    }

    pub fn is_subscribed(&self, provider: ProviderId) -> bool {
        self.registrations.lock().contains_key(&provider)
    }

    /// Cadence the current registration for `provider` asked for
    pub fn request_for(&self, provider: ProviderId) -> Option<UpdateRequest> {
        self.registrations.lock().get(&provider).map(|r| r.request)
    }

    /// Deliver an event to the listener registered for `provider`.
    ///
    /// Returns false when nothing is registered.
    pub fn deliver(&self, provider: ProviderId, event: LocationEvent) -> bool {
        let listener = self
            .registrations
            .lock()
            .get(&provider)
            .map(|r| Arc::clone(&r.listener));
        match listener {
            Some(listener) => {
                listener.on_event(event);
                true
            }
            None => false,
        }
    }

    /// Deliver a fix, stamping it from the shared clock if it has no
    /// monotonic timestamp of its own
    pub fn deliver_fix(&self, provider: ProviderId, mut fix: RawLocation) -> bool {
        if fix.elapsed_realtime_nanos.is_none() {
            fix.elapsed_realtime_nanos = Some(self.clock.now_ns());
        }
        self.deliver(provider, LocationEvent::ReadingReceived(Some(fix)))
    }
}

impl LocationAuthorizer for LoopbackLocationService {
    fn has_location_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }
}

impl ProviderCatalog for LoopbackLocationService {
    fn supported_providers(&self) -> HashSet<ProviderId> {
        self.supported.lock().clone()
    }
}

impl LocationService for LoopbackLocationService {
    fn request_updates(
        &self,
        provider: ProviderId,
        request: UpdateRequest,
        listener: Arc<dyn LocationListener>,
    ) -> LoggerResult<()> {
        {
            let mut revoke_after = self.revoke_after.lock();
            match *revoke_after {
                Some(0) => {
                    self.permission.store(false, Ordering::SeqCst);
                    *revoke_after = None;
                }
                Some(n) => *revoke_after = Some(n - 1),
                None => {}
            }
        }

        if !self.has_location_permission() {
            return Err(LoggerError::Unauthorized);
        }
        if !self.supported.lock().contains(&provider) {
            return Err(LoggerError::Unavailable);
        }

        self.registrations
            .lock()
            .insert(provider, Registration { request, listener });
        Ok(())
    }

    fn remove_updates(&self, provider: ProviderId) -> LoggerResult<()> {
        self.registrations.lock().remove(&provider);
        Ok(())
    }
}
