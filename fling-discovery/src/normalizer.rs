//! Discovery normalizer
//!
//! Registers itself as the only listener of a vendor [`DiscoveryController`]
//! and republishes the three vendor callbacks as [`DiscoveryEvent`]s.
//!
//! # Found vs. updated
//!
//! The vendor reports both new devices and changed descriptions through
//! `device_discovered`. The normalizer remembers the last handle seen per
//! unique identifier: the first report is a `DeviceFound`, later ones are
//! `DeviceUpdated`. The map is reset when a session starts or is closed.
//!
//! # Sessions
//!
//! Every [`start`](DiscoveryNormalizer::start) hands the vendor a fresh
//! listener tagged with a session generation. Callbacks are only accepted from
//! the listener of the current generation while it is searching: once the
//! session failed, was closed or was replaced, its listener goes quiet.
//!
//! # Delivery
//!
//! Vendor callbacks arrive on arbitrary threads. Each event is handed to the
//! observers registered when the vendor callback arrived, inside one job on
//! the normalizer's callback context, so observers see events in vendor order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use fling_api::{DeviceHandle, DiscoveryController, DiscoveryListener, DiscoveryListenerHandle};
use fling_runtime::{ContextSlot, SharedContext};
use parking_lot::{Mutex, RwLock};

use crate::config::{DiscoveryConfig, SearchTarget};
use crate::error::{DiscoveryError, Result};
use crate::event::DiscoveryEvent;

/// Observer of normalized discovery events
pub type EventObserver = Arc<dyn Fn(&DiscoveryEvent) + Send + Sync>;

/// Identifier returned by [`DiscoveryNormalizer::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// State of the current discovery session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started, or closed
    Idle,
    Searching,
    /// The vendor reported a failure; start again to retry
    Failed,
}

struct NormalizerInner {
    controller: Arc<dyn DiscoveryController>,
    config: DiscoveryConfig,
    known: DashMap<String, DeviceHandle>,
    observers: RwLock<Vec<(ObserverId, EventObserver)>>,
    context: ContextSlot,
    session: Mutex<SessionState>,
    generation: AtomicU64,
    next_observer: AtomicU64,
}

/// Normalizes a vendor discovery controller into [`DiscoveryEvent`]s
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```rust,ignore
/// let normalizer = DiscoveryNormalizer::new(controller, DiscoveryConfig::default());
/// normalizer.add_observer(Arc::new(|event: &DiscoveryEvent| match event {
///     DiscoveryEvent::DeviceFound(device) => println!("found {}", device.name()),
///     DiscoveryEvent::DiscoveryFailed => println!("discovery stopped"),
///     _ => {}
/// }));
/// normalizer.start()?;
/// ```
#[derive(Clone)]
pub struct DiscoveryNormalizer {
    inner: Arc<NormalizerInner>,
}

impl DiscoveryNormalizer {
    /// Create a normalizer delivering on the default callback context
    pub fn new(controller: Arc<dyn DiscoveryController>, config: DiscoveryConfig) -> Self {
        Self::with_context(controller, config, None)
    }

    /// Create a normalizer delivering on `context`, or the default when `None`
    pub fn with_context(
        controller: Arc<dyn DiscoveryController>,
        config: DiscoveryConfig,
        context: Option<SharedContext>,
    ) -> Self {
        Self {
            inner: Arc::new(NormalizerInner {
                controller,
                config,
                known: DashMap::new(),
                observers: RwLock::new(Vec::new()),
                context: ContextSlot::new(context),
                session: Mutex::new(SessionState::Idle),
                generation: AtomicU64::new(0),
                next_observer: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.inner.config
    }

    /// Context events are delivered on
    pub fn context(&self) -> SharedContext {
        self.inner.context.get()
    }

    /// Change the delivery context; `None` resets to the default
    pub fn set_context(&self, context: Option<SharedContext>) {
        self.inner.context.set(context);
    }

    /// Register an observer for events published from now on
    pub fn add_observer(&self, observer: EventObserver) -> ObserverId {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.write().push((id, observer));
        id
    }

    /// Remove an observer; returns `false` if it was not registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Start searching with the configured target
    ///
    /// Fails with [`DiscoveryError::AlreadyStarted`] while a search is running.
    /// After a failure or [`close`](Self::close) a new search may be started.
    pub fn start(&self) -> Result<()> {
        self.inner.config.validate()?;

        let generation = {
            let mut session = self.inner.session.lock();
            if *session == SessionState::Searching {
                return Err(DiscoveryError::AlreadyStarted);
            }
            *session = SessionState::Searching;
            self.inner.known.clear();
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let listener: DiscoveryListenerHandle = Arc::new(ListenerAdapter {
            normalizer: Arc::downgrade(&self.inner),
            generation,
        });

        match &self.inner.config.search {
            SearchTarget::DefaultPlayer => {
                tracing::debug!("Searching for the default player");
                self.inner.controller.search_default_player(listener);
            }
            SearchTarget::Player { service_id } => {
                tracing::debug!("Searching for player {}", service_id);
                self.inner.controller.search_player(service_id, listener);
            }
        }

        Ok(())
    }

    /// Resume a search the vendor suspended
    pub fn resume(&self) {
        self.inner.controller.resume();
    }

    /// Stop searching and forget every known device
    pub fn close(&self) {
        self.inner.controller.close();
        {
            let mut session = self.inner.session.lock();
            *session = SessionState::Idle;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.known.clear();
        tracing::debug!("Discovery closed");
    }

    pub fn session_state(&self) -> SessionState {
        *self.inner.session.lock()
    }

    /// Devices seen in the current session
    pub fn known_devices(&self) -> Vec<DeviceHandle> {
        self.inner
            .known
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Last handle seen for `device_id`
    pub fn device(&self, device_id: &str) -> Option<DeviceHandle> {
        self.inner
            .known
            .get(device_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl fmt::Debug for DiscoveryNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryNormalizer")
            .field("config", &self.inner.config)
            .field("session", &self.session_state())
            .field("known", &self.inner.known.len())
            .finish()
    }
}

impl NormalizerInner {
    /// Whether callbacks from the listener of `generation` are still accepted
    fn accepts(&self, generation: u64) -> bool {
        let session = self.session.lock();
        *session == SessionState::Searching
            && self.generation.load(Ordering::SeqCst) == generation
    }

    fn device_discovered(&self, generation: u64, device: DeviceHandle) {
        if !self.accepts(generation) {
            tracing::trace!(
                "Ignoring discovery of {} outside its session",
                device.unique_identifier()
            );
            return;
        }

        let id = device.unique_identifier().to_string();
        let event = match self.known.insert(id, Arc::clone(&device)) {
            Some(_) => DiscoveryEvent::DeviceUpdated(device),
            None => DiscoveryEvent::DeviceFound(device),
        };
        self.publish(event);
    }

    fn device_lost(&self, generation: u64, device: DeviceHandle) {
        if !self.accepts(generation) {
            tracing::trace!(
                "Ignoring loss of {} outside its session",
                device.unique_identifier()
            );
            return;
        }

        if self.known.remove(device.unique_identifier()).is_none() {
            tracing::debug!("Lost device {} that was never found", device.unique_identifier());
        }
        self.publish(DiscoveryEvent::DeviceLost(device));
    }

    fn discovery_failure(&self, generation: u64) {
        {
            let mut session = self.session.lock();
            if *session != SessionState::Searching
                || self.generation.load(Ordering::SeqCst) != generation
            {
                return;
            }
            *session = SessionState::Failed;
        }

        tracing::warn!("Discovery failed; not retrying");
        self.publish(DiscoveryEvent::DiscoveryFailed);
    }

    fn publish(&self, event: DiscoveryEvent) {
        let observers: Vec<EventObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        tracing::debug!(
            "Discovery event {} {:?} for {} observers",
            event.kind(),
            event.device_id(),
            observers.len()
        );

        if observers.is_empty() {
            return;
        }

        self.context.get().execute(Box::new(move || {
            for observer in &observers {
                observer(&event);
            }
        }));
    }
}

/// The listener handed to the vendor controller
///
/// Holds the normalizer weakly: the controller is owned by the normalizer.
struct ListenerAdapter {
    normalizer: Weak<NormalizerInner>,
    generation: u64,
}

impl DiscoveryListener for ListenerAdapter {
    fn device_discovered(&self, device: DeviceHandle) {
        if let Some(normalizer) = self.normalizer.upgrade() {
            normalizer.device_discovered(self.generation, device);
        }
    }

    fn device_lost(&self, device: DeviceHandle) {
        if let Some(normalizer) = self.normalizer.upgrade() {
            normalizer.device_lost(self.generation, device);
        }
    }

    fn discovery_failure(&self) {
        if let Some(normalizer) = self.normalizer.upgrade() {
            normalizer.discovery_failure(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fling_api::testing::FakeMediaPlayer;
    use fling_runtime::{ImmediateContext, SerialContext};
    use mockall::mock;
    use std::sync::mpsc;
    use std::time::Duration;

    mock! {
        pub Controller {}

        impl DiscoveryController for Controller {
            fn search_default_player(&self, listener: DiscoveryListenerHandle);
            fn search_player(&self, service_id: &str, listener: DiscoveryListenerHandle);
            fn resume(&self);
            fn close(&self);
        }
    }

    type ListenerSlot = Arc<Mutex<Option<DiscoveryListenerHandle>>>;

    fn capturing_controller() -> (MockController, ListenerSlot) {
        capturing_controller_for(1)
    }

    fn capturing_controller_for(searches: usize) -> (MockController, ListenerSlot) {
        let slot: ListenerSlot = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&slot);
        let mut controller = MockController::new();
        controller
            .expect_search_default_player()
            .times(searches)
            .returning(move |listener| {
                *captured.lock() = Some(listener);
            });
        (controller, slot)
    }

    fn device(id: &str) -> DeviceHandle {
        Arc::new(FakeMediaPlayer::new(id, "Fire TV"))
    }

    fn recording(normalizer: &DiscoveryNormalizer) -> Arc<Mutex<Vec<String>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        normalizer.add_observer(Arc::new(move |event: &DiscoveryEvent| {
            let id = event.device_id().unwrap_or("-").to_string();
            sink.lock().push(format!("{}:{}", event.kind(), id));
        }));
        events
    }

    fn listener(slot: &ListenerSlot) -> DiscoveryListenerHandle {
        slot.lock().clone().unwrap()
    }

    #[test]
    fn test_second_discovery_is_an_update() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        let listener = listener(&slot);
        listener.device_discovered(device("X"));
        listener.device_discovered(device("X"));

        assert_eq!(*events.lock(), vec!["found:X", "updated:X"]);
        assert_eq!(normalizer.known_devices().len(), 1);
    }

    #[test]
    fn test_lost_without_discovery() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        listener(&slot).device_lost(device("X"));

        assert_eq!(*events.lock(), vec!["lost:X"]);
    }

    #[test]
    fn test_lost_then_found_again() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        let listener = listener(&slot);
        listener.device_discovered(device("X"));
        listener.device_lost(device("X"));
        listener.device_discovered(device("X"));

        assert_eq!(*events.lock(), vec!["found:X", "lost:X", "found:X"]);
    }

    #[test]
    fn test_failure_is_terminal_and_surfaced() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        listener(&slot).discovery_failure();

        assert_eq!(*events.lock(), vec!["failed:-"]);
        assert_eq!(normalizer.session_state(), SessionState::Failed);
    }

    #[test]
    fn test_callbacks_after_failure_are_ignored() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        let listener = listener(&slot);
        listener.device_discovered(device("X"));
        listener.discovery_failure();
        listener.device_discovered(device("Y"));
        listener.device_lost(device("X"));
        listener.discovery_failure();

        assert_eq!(*events.lock(), vec!["found:X", "failed:-"]);
        assert!(normalizer.device("Y").is_none());
    }

    #[test]
    fn test_restart_reports_known_devices_as_found() {
        let (controller, slot) = capturing_controller_for(2);
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        listener(&slot).device_discovered(device("X"));
        listener(&slot).discovery_failure();

        normalizer.start().unwrap();
        assert!(normalizer.known_devices().is_empty());
        listener(&slot).device_discovered(device("X"));

        assert_eq!(*events.lock(), vec!["found:X", "failed:-", "found:X"]);
    }

    #[test]
    fn test_previous_session_listener_is_silenced() {
        let (controller, slot) = capturing_controller_for(2);
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        let previous = listener(&slot);
        previous.discovery_failure();

        normalizer.start().unwrap();
        let current = listener(&slot);
        current.device_discovered(device("X"));
        previous.device_lost(device("X"));
        previous.discovery_failure();

        assert_eq!(*events.lock(), vec!["failed:-", "found:X"]);
        assert_eq!(normalizer.session_state(), SessionState::Searching);
        assert!(normalizer.device("X").is_some());
    }

    #[test]
    fn test_concurrent_reports_yield_one_found_per_device() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);
        normalizer.start().unwrap();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let listener = listener(&slot);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        listener.device_discovered(device(&format!("tv-{n}")));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let events = events.lock();
        let found = events.iter().filter(|e| e.starts_with("found:")).count();
        let updated = events.iter().filter(|e| e.starts_with("updated:")).count();
        assert_eq!(found, 25);
        assert_eq!(updated, 8 * 25 - 25);
        assert_eq!(normalizer.known_devices().len(), 25);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (controller, _slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );

        assert!(normalizer.start().is_ok());
        assert_eq!(normalizer.start(), Err(DiscoveryError::AlreadyStarted));
    }

    #[test]
    fn test_custom_player_search() {
        let mut controller = MockController::new();
        controller
            .expect_search_player()
            .withf(|service_id, _| service_id.to_string() == "amzn.thin.pl")
            .times(1)
            .return_const(());
        controller.expect_close().times(1).return_const(());
        controller.expect_resume().times(1).return_const(());

        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::player("amzn.thin.pl"),
            Some(ImmediateContext::shared()),
        );

        normalizer.start().unwrap();
        normalizer.resume();
        normalizer.close();
        assert_eq!(normalizer.session_state(), SessionState::Idle);
    }

    #[test]
    fn test_close_forgets_devices_and_ignores_late_callbacks() {
        let (mut controller, slot) = capturing_controller();
        controller.expect_close().times(1).return_const(());
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );
        let events = recording(&normalizer);

        normalizer.start().unwrap();
        let listener = listener(&slot);
        listener.device_discovered(device("X"));
        normalizer.close();
        listener.device_discovered(device("Y"));

        assert!(normalizer.known_devices().is_empty());
        assert_eq!(*events.lock(), vec!["found:X"]);
    }

    #[test]
    fn test_late_observers_miss_past_events() {
        let (controller, slot) = capturing_controller();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );

        normalizer.start().unwrap();
        let listener = listener(&slot);
        listener.device_discovered(device("X"));

        let events = recording(&normalizer);
        listener.device_discovered(device("Y"));

        assert_eq!(*events.lock(), vec!["found:Y"]);
    }

    #[test]
    fn test_events_delivered_on_configured_context() {
        let (controller, slot) = capturing_controller();
        let context: SharedContext = SerialContext::shared("discovery-callbacks").unwrap();
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(controller),
            DiscoveryConfig::default(),
            Some(context),
        );

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        normalizer.add_observer(Arc::new(move |_: &DiscoveryEvent| {
            let name = std::thread::current().name().map(str::to_string);
            let _ = tx.lock().send(name);
        }));

        normalizer.start().unwrap();
        let listener = listener(&slot);
        std::thread::Builder::new()
            .name("vendor-discovery".into())
            .spawn(move || listener.device_discovered(device("X")))
            .unwrap()
            .join()
            .unwrap();

        let thread_name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(thread_name.as_deref(), Some("discovery-callbacks"));
    }

    #[test]
    fn test_remove_observer() {
        let normalizer = DiscoveryNormalizer::with_context(
            Arc::new(MockController::new()),
            DiscoveryConfig::default(),
            Some(ImmediateContext::shared()),
        );

        let id = normalizer.add_observer(Arc::new(|_: &DiscoveryEvent| {}));
        assert!(normalizer.remove_observer(id));
        assert!(!normalizer.remove_observer(id));
    }
}
