//! FlingSystem - main entry point for the SDK
//!
//! Runs discovery and keeps one [`FireTvService`] per discovered player.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use fling_api::{DeviceHandle, DiscoveryController};
use fling_discovery::{
    DiscoveryConfig, DiscoveryEvent, DiscoveryNormalizer, EventObserver, ObserverId, SessionState,
};
use parking_lot::{Mutex, RwLock};

use crate::app_state::AppStateChangeNotifier;
use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::service::{FireTvService, ServiceOptions};

struct SystemInner {
    normalizer: DiscoveryNormalizer,
    options: ServiceOptions,
    app_state: Arc<AppStateChangeNotifier>,
    services: RwLock<HashMap<String, FireTvService>>,
    tracker: Mutex<Option<ObserverId>>,
}

/// Discovery plus the services of every player found
///
/// Cheap to clone; clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// use fling_sdk::{FlingSystem, SdkConfig, DiscoveryEvent};
///
/// let system = FlingSystem::new(controller, &SdkConfig::default());
/// let handle = system.clone();
/// system.add_observer(Arc::new(move |event: &DiscoveryEvent| {
///     if let DiscoveryEvent::DeviceFound(device) = event {
///         if let Some(service) = handle.service(device.unique_identifier()) {
///             service.media_control().play(None, None);
///         }
///     }
/// }));
/// system.start()?;
/// ```
#[derive(Clone)]
pub struct FlingSystem {
    inner: Arc<SystemInner>,
}

impl FlingSystem {
    /// Create a system delivering every callback on the default callback context
    pub fn new(controller: Arc<dyn DiscoveryController>, config: &SdkConfig) -> Self {
        let options = ServiceOptions {
            position_update_interval: config.position_update_interval(),
            pause_on_background: config.pause_on_background,
            ..Default::default()
        };
        Self::with_options(controller, config.discovery.clone(), options)
    }

    /// Create a system whose services use `options`
    ///
    /// Discovery events are delivered on `options.callback_context`. Services
    /// follow `options.app_state`, or a notifier owned by the system when that
    /// is `None`; see [`app_state`](Self::app_state).
    pub fn with_options(
        controller: Arc<dyn DiscoveryController>,
        discovery: DiscoveryConfig,
        mut options: ServiceOptions,
    ) -> Self {
        let normalizer =
            DiscoveryNormalizer::with_context(controller, discovery, options.callback_context.clone());
        let app_state = Arc::clone(
            options
                .app_state
                .get_or_insert_with(AppStateChangeNotifier::shared),
        );

        let inner = Arc::new(SystemInner {
            normalizer,
            options,
            app_state,
            services: RwLock::new(HashMap::new()),
            tracker: Mutex::new(None),
        });

        // Registered first so observers added later already see the service
        let system = Arc::downgrade(&inner);
        let id = inner.normalizer.add_observer(Arc::new(move |event: &DiscoveryEvent| {
            if let Some(system) = Weak::upgrade(&system) {
                system.on_event(event);
            }
        }));
        *inner.tracker.lock() = Some(id);

        Self { inner }
    }

    /// Start discovery
    pub fn start(&self) -> Result<(), SdkError> {
        self.inner.normalizer.start()?;
        Ok(())
    }

    /// Resume a search the vendor paused
    pub fn resume(&self) {
        self.inner.normalizer.resume();
    }

    /// Stop discovery and disconnect every service
    pub fn stop(&self) {
        self.inner.normalizer.close();

        let services: Vec<FireTvService> =
            self.inner.services.write().drain().map(|(_, s)| s).collect();
        for service in services {
            service.disconnect();
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.normalizer.session_state()
    }

    pub fn services(&self) -> Vec<FireTvService> {
        self.inner.services.read().values().cloned().collect()
    }

    pub fn service(&self, device_id: &str) -> Option<FireTvService> {
        self.inner.services.read().get(device_id).cloned()
    }

    /// Like [`service`](Self::service), failing with [`SdkError::ServiceNotFound`]
    pub fn require_service(&self, device_id: &str) -> Result<FireTvService, SdkError> {
        self.service(device_id)
            .ok_or_else(|| SdkError::ServiceNotFound(device_id.to_string()))
    }

    pub fn find_service_by_name(&self, name: &str) -> Option<FireTvService> {
        self.inner
            .services
            .read()
            .values()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Register an observer for discovery events
    ///
    /// By the time an observer sees `DeviceFound`, the device's service exists.
    pub fn add_observer(&self, observer: EventObserver) -> ObserverId {
        self.inner.normalizer.add_observer(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.normalizer.remove_observer(id)
    }

    pub fn normalizer(&self) -> &DiscoveryNormalizer {
        &self.inner.normalizer
    }

    /// Notifier the host reports foreground/background transitions to
    ///
    /// Every service of the system pauses its subscriptions on
    /// [`AppState::Background`](crate::AppState::Background) unless
    /// `pause_on_background` is off.
    pub fn app_state(&self) -> &Arc<AppStateChangeNotifier> {
        &self.inner.app_state
    }
}

impl SystemInner {
    fn on_event(&self, event: &DiscoveryEvent) {
        match event {
            DiscoveryEvent::DeviceFound(device) | DiscoveryEvent::DeviceUpdated(device) => {
                self.track(device);
            }
            DiscoveryEvent::DeviceLost(device) => {
                let removed = self.services.write().remove(device.unique_identifier());
                match removed {
                    Some(service) => service.disconnect(),
                    None => tracing::debug!(
                        "Lost untracked device {}",
                        device.unique_identifier()
                    ),
                }
            }
            DiscoveryEvent::DiscoveryFailed => {
                tracing::warn!(
                    "Discovery failed; keeping {} known service(s)",
                    self.services.read().len()
                );
            }
        }
    }

    fn track(&self, device: &DeviceHandle) {
        let device_id = device.unique_identifier().to_string();

        // Lookup and insert under one lock; service callbacks run after it is released
        let (service, created) = match self.services.write().entry(device_id) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let service = FireTvService::new(device.clone(), self.options.clone());
                (entry.insert(service).clone(), true)
            }
        };

        if created {
            service.connect();
        } else {
            service.update_device(device.clone());
        }
    }
}

impl Drop for SystemInner {
    fn drop(&mut self) {
        if let Some(id) = self.tracker.lock().take() {
            self.normalizer.remove_observer(id);
        }
    }
}

impl fmt::Debug for FlingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlingSystem")
            .field("session", &self.session_state())
            .field("services", &self.inner.services.read().len())
            .finish()
    }
}
