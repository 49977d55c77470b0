//! Per-device service
//!
//! A [`FireTvService`] bundles everything the SDK keeps for one discovered
//! player: the [`CapabilityMixin`], the capability facades built on it and
//! the subscription manager behind their status callbacks.
//!
//! # Teardown
//!
//! Status callbacks usually capture application objects. They are released
//! by [`FireTvService::disconnect`], which removes every subscription of the
//! device. Dropping the last clone of a service does the same.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use fling_api::DeviceHandle;
use fling_event_manager::{ListenerRole, SubscriptionLifecycleManager};
use fling_runtime::{default_callback_context, ContextSlot, SharedContext};
use parking_lot::{Mutex, RwLock};

use crate::app_state::{AppState, AppStateChangeNotifier, AppStateObserverId};
use crate::capability::{
    CapabilityMixin, FireTvMediaControl, FireTvMediaPlayer, FireTvVolumeControl, MediaControl,
    MediaPlayer, VolumeControl,
};
use crate::error::ServiceError;

/// Identifier the Fire TV service is registered under
pub const FIRETV_SERVICE_ID: &str = "FireTV";

/// Receives connection changes of a service
pub trait ServiceDelegate: Send + Sync {
    fn service_connection_ready(&self, service: &FireTvService);

    /// `error` is set when the service went away for a reason other than [`FireTvService::disconnect`]
    fn service_disconnected(&self, service: &FireTvService, error: Option<ServiceError>);

    /// Subscriptions were dropped because the player's handle was replaced
    ///
    /// The `Subscription`s of `roles` are now `Removed`; subscribe again
    /// through the service's facades to keep receiving updates.
    fn service_subscriptions_removed(&self, _service: &FireTvService, _roles: Vec<ListenerRole>) {}
}

/// How a service delivers callbacks and reacts to the host lifecycle
#[derive(Clone)]
pub struct ServiceOptions {
    /// Context user callbacks run on; the default callback context when `None`
    pub callback_context: Option<SharedContext>,
    /// Context vendor continuations run on; the callback context when `None`
    pub executor: Option<SharedContext>,
    /// Position update interval applied when the status listener is registered
    pub position_update_interval: Option<Duration>,
    /// Pause subscriptions while the host is in the background
    pub pause_on_background: bool,
    pub app_state: Option<Arc<AppStateChangeNotifier>>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            callback_context: None,
            executor: None,
            position_update_interval: None,
            pause_on_background: true,
            app_state: None,
        }
    }
}

impl fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("callback_context", &self.callback_context.as_ref().map(|c| c.name()))
            .field("executor", &self.executor.as_ref().map(|c| c.name()))
            .field("position_update_interval", &self.position_update_interval)
            .field("pause_on_background", &self.pause_on_background)
            .finish()
    }
}

struct Facades {
    mixin: Arc<CapabilityMixin>,
    media_control: Arc<FireTvMediaControl>,
    media_player: Arc<FireTvMediaPlayer>,
    volume_control: Arc<FireTvVolumeControl>,
}

struct ServiceInner {
    device_id: String,
    name: RwLock<String>,
    callback_context: SharedContext,
    executor: SharedContext,
    position_update_interval: Option<Duration>,
    subscriptions: SubscriptionLifecycleManager,
    facades: RwLock<Facades>,
    delegate: RwLock<Option<Weak<dyn ServiceDelegate>>>,
    delegate_context: ContextSlot,
    connected: AtomicBool,
    app_state: Option<(Arc<AppStateChangeNotifier>, Mutex<Option<AppStateObserverId>>)>,
}

/// Control of one Fire TV player
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct FireTvService {
    inner: Arc<ServiceInner>,
}

impl FireTvService {
    pub fn new(device: DeviceHandle, options: ServiceOptions) -> Self {
        let callback_context = options
            .callback_context
            .clone()
            .unwrap_or_else(default_callback_context);
        let executor = options
            .executor
            .clone()
            .unwrap_or_else(|| callback_context.clone());
        let subscriptions = SubscriptionLifecycleManager::new(callback_context.clone());
        let facades = build_facades(
            device.clone(),
            &executor,
            &callback_context,
            &subscriptions,
            options.position_update_interval,
        );

        let inner = Arc::new(ServiceInner {
            device_id: device.unique_identifier().to_string(),
            name: RwLock::new(device.name().to_string()),
            callback_context,
            executor,
            position_update_interval: options.position_update_interval,
            subscriptions,
            facades: RwLock::new(facades),
            delegate: RwLock::new(None),
            delegate_context: ContextSlot::new(None),
            connected: AtomicBool::new(false),
            app_state: options
                .app_state
                .filter(|_| options.pause_on_background)
                .map(|notifier| (notifier, Mutex::new(None))),
        });

        if let Some((notifier, observer)) = &inner.app_state {
            let service = Arc::downgrade(&inner);
            let id = notifier.add_observer(Arc::new(move |state| {
                if let Some(service) = service.upgrade() {
                    service.on_app_state(state);
                }
            }));
            *observer.lock() = Some(id);
        }

        tracing::debug!("Created {} service for {}", FIRETV_SERVICE_ID, inner.device_id);
        Self { inner }
    }

    pub fn service_id(&self) -> &'static str {
        FIRETV_SERVICE_ID
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    pub fn device(&self) -> DeviceHandle {
        self.inner.facades.read().mixin.device().clone()
    }

    pub fn mixin(&self) -> Arc<CapabilityMixin> {
        Arc::clone(&self.inner.facades.read().mixin)
    }

    pub fn media_control(&self) -> Arc<dyn MediaControl> {
        self.inner.facades.read().media_control.clone()
    }

    /// The media control with its Fire TV specific extras
    pub fn firetv_media_control(&self) -> Arc<FireTvMediaControl> {
        Arc::clone(&self.inner.facades.read().media_control)
    }

    pub fn media_player(&self) -> Arc<dyn MediaPlayer> {
        self.inner.facades.read().media_player.clone()
    }

    pub fn firetv_media_player(&self) -> Arc<FireTvMediaPlayer> {
        Arc::clone(&self.inner.facades.read().media_player)
    }

    pub fn volume_control(&self) -> Arc<dyn VolumeControl> {
        self.inner.facades.read().volume_control.clone()
    }

    pub fn subscriptions(&self) -> &SubscriptionLifecycleManager {
        &self.inner.subscriptions
    }

    /// Set the delegate; the service only keeps a weak reference
    pub fn set_delegate(&self, delegate: Option<&Arc<dyn ServiceDelegate>>) {
        *self.inner.delegate.write() = delegate.map(Arc::downgrade);
    }

    /// Context delegate callbacks run on; `None` resets to the default callback context
    pub fn set_delegate_context(&self, context: Option<SharedContext>) {
        self.inner.delegate_context.set(context);
    }

    pub fn delegate_context(&self) -> SharedContext {
        self.inner.delegate_context.get()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Mark the service ready; the player needs no handshake
    pub fn connect(&self) {
        if self.inner.connected.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!("Connected to {}", self.inner.device_id);
        self.notify_delegate(|delegate, service| delegate.service_connection_ready(service));
    }

    /// Tear down every subscription and tell the delegate
    ///
    /// Must be called before dropping whatever the status callbacks captured.
    pub fn disconnect(&self) {
        self.disconnect_with(None);
    }

    pub(crate) fn disconnect_with(&self, error: Option<ServiceError>) {
        self.inner.subscriptions.unsubscribe_all(&self.inner.device_id);

        if !self.inner.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        tracing::debug!("Disconnected from {}", self.inner.device_id);
        self.notify_delegate(move |delegate, service| {
            delegate.service_disconnected(service, error)
        });
    }

    /// Point the service at a refreshed handle for the same player
    ///
    /// Subscriptions of the old handle are removed and the delegate is told
    /// which roles were lost through
    /// [`ServiceDelegate::service_subscriptions_removed`].
    pub fn update_device(&self, device: DeviceHandle) {
        let current = self.device();
        if same_device(&current, &device) {
            return;
        }

        tracing::debug!("Device handle for {} replaced", self.inner.device_id);
        let removed = self.inner.subscriptions.active_roles(&self.inner.device_id);
        self.inner.subscriptions.unsubscribe_all(&self.inner.device_id);
        *self.inner.name.write() = device.name().to_string();
        *self.inner.facades.write() = build_facades(
            device,
            &self.inner.executor,
            &self.inner.callback_context,
            &self.inner.subscriptions,
            self.inner.position_update_interval,
        );

        if !removed.is_empty() {
            tracing::debug!(
                "Removed {} subscription(s) of the old handle for {}",
                removed.len(),
                self.inner.device_id
            );
            self.notify_delegate(move |delegate, service| {
                delegate.service_subscriptions_removed(service, removed)
            });
        }
    }

    fn notify_delegate<F>(&self, notify: F)
    where
        F: FnOnce(&dyn ServiceDelegate, &FireTvService) + Send + 'static,
    {
        let Some(delegate) = self.inner.delegate.read().as_ref().and_then(Weak::upgrade) else {
            return;
        };

        let service = self.clone();
        self.inner
            .delegate_context
            .get()
            .execute(Box::new(move || notify(delegate.as_ref(), &service)));
    }
}

impl ServiceInner {
    fn on_app_state(&self, state: AppState) {
        match state {
            AppState::Background => {
                let paused = self.subscriptions.pause_all();
                tracing::debug!("Paused {} subscription(s) for {}", paused, self.device_id);
            }
            AppState::Foreground => {
                let media_control = Arc::clone(&self.facades.read().media_control);
                let resumed = usize::from(media_control.resume_subscriptions());
                tracing::debug!("Resumed {} subscription(s) for {}", resumed, self.device_id);
            }
        }
    }
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        if let Some((notifier, observer)) = &self.app_state {
            if let Some(id) = observer.lock().take() {
                notifier.remove_observer(id);
            }
        }
        self.subscriptions.clear();
    }
}

impl fmt::Debug for FireTvService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FireTvService")
            .field("device_id", &self.inner.device_id)
            .field("name", &*self.inner.name.read())
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn build_facades(
    device: DeviceHandle,
    executor: &SharedContext,
    callback_context: &SharedContext,
    subscriptions: &SubscriptionLifecycleManager,
    position_update_interval: Option<Duration>,
) -> Facades {
    let mixin = Arc::new(CapabilityMixin::with_executor(
        device,
        executor.clone(),
        callback_context.clone(),
    ));
    let media_control = Arc::new(FireTvMediaControl::new(
        Arc::clone(&mixin),
        subscriptions.clone(),
        position_update_interval,
    ));

    Facades {
        mixin,
        media_player: Arc::new(FireTvMediaPlayer::new(Arc::clone(&media_control))),
        volume_control: Arc::new(FireTvVolumeControl::new(Arc::clone(&media_control))),
        media_control,
    }
}

fn same_device(a: &DeviceHandle, b: &DeviceHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
