//! Provider subscription management
//!
//! Subscribes to the primary provider and, when present, the secondary one as
//! a fallback. Both deliver into the same ingestion entry point; readings from
//! the two are not de-duplicated.

use crate::capture::traits::{
    LocationAuthorizer, LocationEvent, LocationListener, LocationService, ProviderCatalog,
    ProviderId, UpdateRequest,
};
use crate::utils::config::RecorderConfig;
use crate::utils::error::LoggerResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer of provider events, tagged with their origin
pub trait LocationIngest: Send + Sync {
    fn ingest(&self, provider: ProviderId, event: LocationEvent);
}

/// Platform listener for a single provider; forwards events unmodified
struct ProviderForwarder {
    provider: ProviderId,
    target: Arc<dyn LocationIngest>,
}

impl LocationListener for ProviderForwarder {
    fn on_event(&self, event: LocationEvent) {
        self.target.ingest(self.provider, event);
    }
}

/// Manages subscriptions to the redundant location providers
pub struct ProviderManager {
    service: Arc<dyn LocationService>,
    catalog: Arc<dyn ProviderCatalog>,
    authorizer: Arc<dyn LocationAuthorizer>,
    request: UpdateRequest,
    use_secondary: bool,
    /// Registered providers, in subscription order
    subscriptions: Mutex<Vec<ProviderId>>,
}

impl ProviderManager {
    pub fn new(
        service: Arc<dyn LocationService>,
        catalog: Arc<dyn ProviderCatalog>,
        authorizer: Arc<dyn LocationAuthorizer>,
        config: &RecorderConfig,
    ) -> Self {
        Self {
            service,
            catalog,
            authorizer,
            request: UpdateRequest {
                min_interval: config.min_update_interval(),
                min_distance_m: config.min_distance_m,
            },
            use_secondary: config.use_secondary_provider,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to the primary provider, plus the secondary one when it is
    /// supported, routing events into `target`.
    ///
    /// Returns `Ok(false)` if the primary provider is not supported or
    /// permission is missing. Fails with `Unauthorized` if permission is revoked while
    /// subscribing, after removing whatever had already been registered.
    pub fn enable(&self, target: Arc<dyn LocationIngest>) -> LoggerResult<bool> {
        tracing::debug!("Enabling location providers");

        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            tracing::debug!("Location providers already enabled");
            return Ok(true);
        }

        let supported = self.catalog.supported_providers();
        if !supported.contains(&ProviderId::Primary) {
            tracing::error!("{} location provider not available", ProviderId::Primary);
            return Ok(false);
        }
        let wanted: Vec<ProviderId> = ProviderId::ALL
            .into_iter()
            .filter(|p| supported.contains(p))
            .filter(|p| *p == ProviderId::Primary || self.use_secondary)
            .collect();

        if !self.authorizer.has_location_permission() {
            tracing::error!("Location permission not granted");
            return Ok(false);
        }

        for provider in wanted {
            let listener: Arc<dyn LocationListener> = Arc::new(ProviderForwarder {
                provider,
                target: Arc::clone(&target),
            });
            if let Err(e) = self.service.request_updates(provider, self.request, listener) {
                tracing::error!("Failed to subscribe to {} provider: {}", provider, e);
                self.remove_all(&mut subscriptions);
                return Err(e);
            }
            tracing::debug!("{} listener registered", provider);
            subscriptions.push(provider);
        }

        Ok(true)
    }

    /// Remove every active subscription. Safe to call at any time.
    pub fn disable(&self) {
        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.is_empty() {
            return;
        }
        tracing::debug!("Disabling location providers");
        self.remove_all(&mut subscriptions);
    }

    fn remove_all(&self, subscriptions: &mut Vec<ProviderId>) {
        for provider in subscriptions.drain(..) {
            if let Err(e) = self.service.remove_updates(provider) {
                tracing::warn!("Failed to remove {} listener: {}", provider, e);
            }
        }
    }

    /// Providers currently subscribed, primary first
    pub fn active_providers(&self) -> Vec<ProviderId> {
        self.subscriptions.lock().clone()
    }

    pub fn is_listening(&self) -> bool {
        !self.subscriptions.lock().is_empty()
    }
}
