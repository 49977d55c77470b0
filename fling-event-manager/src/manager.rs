//! Subscription lifecycle manager
//!
//! Tracks every status subscription per device and owns the transitions
//! between [`SubscriptionState`]s. One vendor listener is registered per
//! device no matter how many role subscriptions exist for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fling_api::{ApiTask, DeviceHandle, StatusListenerHandle};
use fling_runtime::{default_callback_context, ImmediateContext, SharedContext, Task};
use parking_lot::Mutex;

use crate::fanout::StatusFanout;
use crate::subscription::{
    ListenerRole, StatusCallback, Subscription, SubscriptionId, SubscriptionState,
};

/// Result of [`SubscriptionLifecycleManager::subscribe`]
pub struct Subscribed {
    pub subscription: Subscription,
    /// Vendor registration, present only when this call attached the device's listener
    ///
    /// A failed registration tears the device's subscriptions down again.
    pub registration: Option<ApiTask<()>>,
}

impl fmt::Debug for Subscribed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribed")
            .field("subscription", &self.subscription)
            .field("registration", &self.registration)
            .finish()
    }
}

struct DeviceEntry {
    device: DeviceHandle,
    fanout: Arc<StatusFanout>,
    roles: HashMap<ListenerRole, SubscriptionId>,
}

pub(crate) struct ManagerInner {
    context: SharedContext,
    /// Device id -> subscriptions; only locked for bookkeeping, never while calling the vendor
    devices: Mutex<HashMap<String, DeviceEntry>>,
    index: DashMap<SubscriptionId, (String, ListenerRole)>,
    next_id: AtomicU64,
}

/// Manages status subscriptions for any number of devices
///
/// Cheap to clone; clones share the same registry.
///
/// # Example
///
/// ```rust,ignore
/// let manager = SubscriptionLifecycleManager::new(callback_context);
/// let subscribed = manager.subscribe(&device, ListenerRole::PlayState, Arc::new(|status| {
///     println!("{:?}", status.play_state());
/// }));
///
/// // App goes to the background
/// manager.pause(device.unique_identifier());
/// // ... and comes back
/// manager.resume(device.unique_identifier());
///
/// // Mandatory before dropping whatever the callback captured
/// manager.unsubscribe_all(device.unique_identifier());
/// ```
#[derive(Clone)]
pub struct SubscriptionLifecycleManager {
    inner: Arc<ManagerInner>,
}

impl SubscriptionLifecycleManager {
    /// Create a manager delivering updates on `context`
    pub fn new(context: SharedContext) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                context,
                devices: Mutex::new(HashMap::new()),
                index: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a manager delivering updates on the default callback context
    pub fn with_default_context() -> Self {
        Self::new(default_callback_context())
    }

    /// Context status callbacks are delivered on
    pub fn context(&self) -> &SharedContext {
        &self.inner.context
    }

    /// Subscribe to status updates of `device` under `role`
    ///
    /// The first subscription for a device registers the shared vendor listener
    /// and returns the registration task. Subscribing again with a role the
    /// device already has returns the existing subscription with its callback
    /// replaced, and never registers with the vendor twice. A new role on a
    /// paused device starts receiving updates once the device is resumed.
    pub fn subscribe(
        &self,
        device: &DeviceHandle,
        role: ListenerRole,
        callback: StatusCallback,
    ) -> Subscribed {
        let device_id = device.unique_identifier().to_string();
        let mut devices = self.inner.devices.lock();

        if let Some(entry) = devices.get_mut(&device_id) {
            let id = match entry.roles.get(&role) {
                Some(&id) => {
                    entry.fanout.replace_callback(id, callback);
                    tracing::debug!("Reusing subscription {} ({}) on {}", id, role, device_id);
                    id
                }
                None => {
                    let id = self.inner.allocate_id();
                    entry.roles.insert(role.clone(), id);
                    entry.fanout.add_subscriber(id, role.clone(), callback);
                    self.inner.index.insert(id, (device_id.clone(), role.clone()));
                    tracing::debug!(
                        "Added subscription {} ({}) on {}, {} roles total",
                        id,
                        role,
                        device_id,
                        entry.roles.len()
                    );
                    id
                }
            };

            return Subscribed {
                subscription: self.handle(id, role, device_id),
                registration: None,
            };
        }

        let fanout = StatusFanout::new(device_id.clone(), Arc::clone(&self.inner.context));
        let id = self.inner.allocate_id();
        fanout.add_subscriber(id, role.clone(), callback);
        devices.insert(
            device_id.clone(),
            DeviceEntry {
                device: Arc::clone(device),
                fanout: Arc::clone(&fanout),
                roles: HashMap::from([(role.clone(), id)]),
            },
        );
        self.inner.index.insert(id, (device_id.clone(), role.clone()));

        // Hold the transition lock before publishing so a racing pause cannot
        // detach ahead of the attach
        let _transition = fanout.lock_transition();
        drop(devices);

        tracing::debug!(
            "First subscription {} ({}) on {}, registering status listener",
            id,
            role,
            device_id
        );
        let registration = self.inner.register(device, &fanout);

        Subscribed {
            subscription: self.handle(id, role, device_id),
            registration: Some(registration),
        }
    }

    /// Remove a single subscription
    ///
    /// Removing the last subscription of a device tears the device down as
    /// [`unsubscribe_all`](Self::unsubscribe_all) does. Returns `false` if the
    /// subscription was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Detach the vendor listener but keep every subscription (`Active -> Paused`)
    ///
    /// No-op returning `false` when the device is paused, removed, or unknown.
    pub fn pause(&self, device_id: &str) -> bool {
        let Some((device, fanout)) = self.inner.lookup(device_id) else {
            return false;
        };

        let _transition = fanout.lock_transition();
        if !fanout.transition(SubscriptionState::Active, SubscriptionState::Paused) {
            return false;
        }

        detach(&device, &fanout);
        true
    }

    /// Re-attach the vendor listener (`Paused -> Active`)
    ///
    /// No-op returning `false` when the device is active, removed, or unknown.
    /// If the vendor rejects the re-attach the device falls back to `Paused`.
    pub fn resume(&self, device_id: &str) -> bool {
        let Some((device, fanout)) = self.inner.lookup(device_id) else {
            return false;
        };

        let _transition = fanout.lock_transition();
        if !fanout.transition(SubscriptionState::Paused, SubscriptionState::Active) {
            return false;
        }

        let listener: StatusListenerHandle = Arc::clone(&fanout) as StatusListenerHandle;
        let id = device_id.to_string();
        let attached = Arc::clone(&fanout);
        device
            .add_status_listener(listener)
            .continue_with(ImmediateContext::shared(), move |result| {
                if let Err(e) = result {
                    tracing::warn!("Failed to re-attach status listener on {}: {}", id, e);
                    attached.transition(SubscriptionState::Active, SubscriptionState::Paused);
                }
            });
        true
    }

    /// Detach and forget every subscription of a device (`* -> Removed`)
    ///
    /// This is the teardown that releases the callbacks, and with them
    /// whatever they captured. Returns `false` if the device had none.
    pub fn unsubscribe_all(&self, device_id: &str) -> bool {
        let entry = {
            let mut devices = self.inner.devices.lock();
            devices.remove(device_id)
        };

        match entry {
            Some(entry) => {
                self.inner.teardown(device_id, entry);
                true
            }
            None => false,
        }
    }

    /// Pause every device; returns how many transitioned
    pub fn pause_all(&self) -> usize {
        self.device_ids()
            .iter()
            .filter(|id| self.pause(id))
            .count()
    }

    /// Resume every device; returns how many transitioned
    pub fn resume_all(&self) -> usize {
        self.device_ids()
            .iter()
            .filter(|id| self.resume(id))
            .count()
    }

    /// Tear down every device
    pub fn clear(&self) {
        let entries: Vec<(String, DeviceEntry)> = self.inner.devices.lock().drain().collect();
        for (device_id, entry) in entries {
            self.inner.teardown(&device_id, entry);
        }
    }

    /// State of a device's subscriptions; `Removed` if it has none
    pub fn state(&self, device_id: &str) -> SubscriptionState {
        self.inner
            .devices
            .lock()
            .get(device_id)
            .map(|entry| entry.fanout.state())
            .unwrap_or(SubscriptionState::Removed)
    }

    /// State of a single subscription
    pub fn subscription_state(&self, id: SubscriptionId) -> SubscriptionState {
        self.inner.subscription_state(id)
    }

    /// Roles subscribed on a device
    pub fn active_roles(&self, device_id: &str) -> Vec<ListenerRole> {
        self.inner
            .devices
            .lock()
            .get(device_id)
            .map(|entry| entry.fanout.roles())
            .unwrap_or_default()
    }

    /// Ids of devices with at least one subscription
    pub fn device_ids(&self) -> Vec<String> {
        self.inner.devices.lock().keys().cloned().collect()
    }

    /// Total number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.inner.index.len()
    }

    fn handle(&self, id: SubscriptionId, role: ListenerRole, device_id: String) -> Subscription {
        Subscription {
            id,
            role,
            device_id,
            manager: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for SubscriptionLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionLifecycleManager")
            .field("context", &self.inner.context.name())
            .field("devices", &self.device_ids())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl ManagerInner {
    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn lookup(&self, device_id: &str) -> Option<(DeviceHandle, Arc<StatusFanout>)> {
        self.devices
            .lock()
            .get(device_id)
            .map(|entry| (Arc::clone(&entry.device), Arc::clone(&entry.fanout)))
    }

    /// Attach the device's listener, rolling the device back if the vendor refuses
    fn register(self: &Arc<Self>, device: &DeviceHandle, fanout: &Arc<StatusFanout>) -> ApiTask<()> {
        let listener: StatusListenerHandle = Arc::clone(fanout) as StatusListenerHandle;
        let (source, task) = Task::pending();

        let manager = Arc::downgrade(self);
        let fanout = Arc::clone(fanout);
        let device_id = device.unique_identifier().to_string();

        device
            .add_status_listener(listener)
            .continue_with(ImmediateContext::shared(), move |result| {
                if let Err(e) = &result {
                    tracing::warn!("Failed to register status listener on {}: {}", device_id, e);
                    if let Some(manager) = manager.upgrade() {
                        manager.discard(&device_id, &fanout);
                    }
                }
                source.complete(result);
            });

        task
    }

    /// Forget a device whose listener never got attached
    fn discard(&self, device_id: &str, fanout: &Arc<StatusFanout>) {
        let mut devices = self.devices.lock();
        let is_same = devices
            .get(device_id)
            .map(|entry| Arc::ptr_eq(&entry.fanout, fanout))
            .unwrap_or(false);

        if is_same {
            if let Some(entry) = devices.remove(device_id) {
                for id in entry.roles.values() {
                    self.index.remove(id);
                }
            }
        }
        drop(devices);
        fanout.remove();
    }

    fn teardown(&self, device_id: &str, entry: DeviceEntry) {
        for id in entry.roles.values() {
            self.index.remove(id);
        }

        let _transition = entry.fanout.lock_transition();
        let previous = entry.fanout.remove();
        if previous == SubscriptionState::Active {
            detach(&entry.device, &entry.fanout);
        }

        tracing::debug!(
            "Removed {} subscriptions on {} (was {:?})",
            entry.roles.len(),
            device_id,
            previous
        );
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some((device_id, role)) = self.index.get(&id).map(|e| e.value().clone()) else {
            return false;
        };

        let mut devices = self.devices.lock();
        let Some(entry) = devices.get_mut(&device_id) else {
            self.index.remove(&id);
            return false;
        };
        if entry.roles.get(&role) != Some(&id) {
            return false;
        }

        entry.roles.remove(&role);
        self.index.remove(&id);
        let remaining = entry.fanout.remove_subscriber(id);
        tracing::debug!("Removed subscription {} ({}) on {}", id, role, device_id);

        if remaining > 0 {
            return true;
        }

        let entry = devices.remove(&device_id);
        drop(devices);

        if let Some(entry) = entry {
            self.teardown(&device_id, entry);
        }
        true
    }

    pub(crate) fn subscription_state(&self, id: SubscriptionId) -> SubscriptionState {
        let Some((device_id, _)) = self.index.get(&id).map(|e| e.value().clone()) else {
            return SubscriptionState::Removed;
        };

        self.devices
            .lock()
            .get(&device_id)
            .map(|entry| entry.fanout.state())
            .unwrap_or(SubscriptionState::Removed)
    }
}

fn detach(device: &DeviceHandle, fanout: &Arc<StatusFanout>) {
    let listener: StatusListenerHandle = Arc::clone(fanout) as StatusListenerHandle;
    let device_id = device.unique_identifier().to_string();

    device
        .remove_status_listener(listener)
        .continue_with(ImmediateContext::shared(), move |result| {
            if let Err(e) = result {
                tracing::warn!("Failed to detach status listener on {}: {}", device_id, e);
            }
        });
}
