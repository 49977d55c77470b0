//! The single vendor-side listener registered per device
//!
//! The vendor supports one status listener per player, so the manager
//! registers exactly one [`StatusFanout`] per device and multiplexes every
//! role subscription through it. The fanout owns the device's lifecycle
//! state; the delivery path reads that state and the subscriber list but
//! never touches the manager's device map.

use std::sync::{Arc, Weak};

use fling_api::{MediaPlayerStatus, MediaPlayerStatusListener};
use fling_runtime::SharedContext;
use fling_state::PlaybackStatus;
use parking_lot::{Mutex, MutexGuard, ReentrantMutex, RwLock};

use crate::subscription::{ListenerRole, StatusCallback, SubscriptionId, SubscriptionState};

struct Subscriber {
    id: SubscriptionId,
    role: ListenerRole,
    callback: StatusCallback,
}

pub(crate) struct StatusFanout {
    device_id: String,
    me: Weak<StatusFanout>,
    context: SharedContext,
    state: RwLock<SubscriptionState>,
    subscribers: RwLock<Vec<Subscriber>>,
    /// Serializes vendor attach/detach calls for this device
    transition: Mutex<()>,
    /// Held while callbacks run; reentrant so a callback may tear its own device down
    delivery: ReentrantMutex<()>,
}

impl StatusFanout {
    pub(crate) fn new(device_id: String, context: SharedContext) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            device_id,
            me: me.clone(),
            context,
            state: RwLock::new(SubscriptionState::Active),
            subscribers: RwLock::new(Vec::new()),
            transition: Mutex::new(()),
            delivery: ReentrantMutex::new(()),
        })
    }

    pub(crate) fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock()
    }

    pub(crate) fn state(&self) -> SubscriptionState {
        *self.state.read()
    }

    /// Move from `from` to `to`; returns whether the transition happened
    ///
    /// `Removed` is terminal and is only entered through [`remove`](Self::remove).
    pub(crate) fn transition(&self, from: SubscriptionState, to: SubscriptionState) -> bool {
        let mut state = self.state.write();
        if *state != from || from == SubscriptionState::Removed || to == SubscriptionState::Removed {
            return false;
        }
        *state = to;
        tracing::debug!("Subscriptions for {}: {:?} -> {:?}", self.device_id, from, to);
        true
    }

    /// Enter the terminal state and drop every subscriber
    ///
    /// Waits for a delivery running on another thread, so no callback runs
    /// once this returns. Returns the state the fanout was in before.
    pub(crate) fn remove(&self) -> SubscriptionState {
        let _delivery = self.delivery.lock();
        let previous = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, SubscriptionState::Removed)
        };
        self.subscribers.write().clear();

        if previous != SubscriptionState::Removed {
            tracing::debug!(
                "Subscriptions for {}: {:?} -> Removed",
                self.device_id,
                previous
            );
        }
        previous
    }

    pub(crate) fn add_subscriber(
        &self,
        id: SubscriptionId,
        role: ListenerRole,
        callback: StatusCallback,
    ) {
        self.subscribers.write().push(Subscriber { id, role, callback });
    }

    /// Replace the callback of an existing subscription
    pub(crate) fn replace_callback(&self, id: SubscriptionId, callback: StatusCallback) {
        if let Some(subscriber) = self.subscribers.write().iter_mut().find(|s| s.id == id) {
            subscriber.callback = callback;
        }
    }

    /// Remove one subscriber; returns how many remain
    pub(crate) fn remove_subscriber(&self, id: SubscriptionId) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| s.id != id);
        subscribers.len()
    }

    pub(crate) fn roles(&self) -> Vec<ListenerRole> {
        self.subscribers.read().iter().map(|s| s.role.clone()).collect()
    }

    fn is_delivering(&self, id: SubscriptionId) -> bool {
        self.state() == SubscriptionState::Active
            && self.subscribers.read().iter().any(|s| s.id == id)
    }
}

impl MediaPlayerStatusListener for StatusFanout {
    fn on_status_change(&self, status: &MediaPlayerStatus, position_ms: i64) {
        if self.state() != SubscriptionState::Active {
            tracing::trace!(
                "Dropping status update for {} while {:?}",
                self.device_id,
                self.state()
            );
            return;
        }

        let status = PlaybackStatus::from_vendor(status, position_ms);
        let targets: Vec<(SubscriptionId, StatusCallback)> = self
            .subscribers
            .read()
            .iter()
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect();

        if targets.is_empty() {
            return;
        }

        let me = self.me.clone();
        self.context.execute(Box::new(move || {
            let Some(fanout) = me.upgrade() else {
                tracing::trace!("Dropping status update for a torn down device");
                return;
            };

            // State may have changed while the job was queued
            let _delivery = fanout.delivery.lock();
            for (id, callback) in targets {
                if fanout.is_delivering(id) {
                    callback(&status);
                } else {
                    tracing::trace!("Dropping late status update for {}", id);
                }
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fling_api::{MediaCondition, MediaState};
    use fling_runtime::ImmediateContext;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (Arc<AtomicUsize>, StatusCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        (count, Arc::new(move |_: &PlaybackStatus| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn playing() -> MediaPlayerStatus {
        MediaPlayerStatus::new(MediaState::Playing, MediaCondition::Good)
    }

    #[test]
    fn test_delivers_to_every_subscriber_while_active() {
        let fanout = StatusFanout::new("dev-1".into(), ImmediateContext::shared());
        let (a, cb_a) = counting_callback();
        let (b, cb_b) = counting_callback();
        fanout.add_subscriber(SubscriptionId(1), ListenerRole::Status, cb_a);
        fanout.add_subscriber(SubscriptionId(2), ListenerRole::Volume, cb_b);

        fanout.on_status_change(&playing(), 100);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drops_updates_when_not_active() {
        let fanout = StatusFanout::new("dev-1".into(), ImmediateContext::shared());
        let (count, callback) = counting_callback();
        fanout.add_subscriber(SubscriptionId(1), ListenerRole::Status, callback);

        assert!(fanout.transition(SubscriptionState::Active, SubscriptionState::Paused));
        fanout.on_status_change(&playing(), 100);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert_eq!(fanout.remove(), SubscriptionState::Paused);
        fanout.on_status_change(&playing(), 200);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(fanout.roles().is_empty());
    }

    #[test]
    fn test_transition_requires_expected_state() {
        let fanout = StatusFanout::new("dev-1".into(), ImmediateContext::shared());

        assert!(!fanout.transition(SubscriptionState::Paused, SubscriptionState::Active));
        fanout.remove();
        assert!(!fanout.transition(SubscriptionState::Removed, SubscriptionState::Active));
        assert_eq!(fanout.state(), SubscriptionState::Removed);
    }

    #[test]
    fn test_callback_may_remove_its_own_fanout() {
        let fanout = StatusFanout::new("dev-1".into(), ImmediateContext::shared());
        let slot: Arc<std::sync::OnceLock<Weak<StatusFanout>>> = Arc::new(std::sync::OnceLock::new());
        let _ = slot.set(Arc::downgrade(&fanout));

        let target = Arc::clone(&slot);
        let callback: StatusCallback = Arc::new(move |_: &PlaybackStatus| {
            if let Some(fanout) = target.get().and_then(Weak::upgrade) {
                fanout.remove();
            }
        });
        fanout.add_subscriber(SubscriptionId(1), ListenerRole::Status, callback);

        fanout.on_status_change(&playing(), 0);

        assert_eq!(fanout.state(), SubscriptionState::Removed);
    }

    #[test]
    fn test_remove_waits_for_running_callback() {
        use std::sync::atomic::AtomicBool;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let fanout = StatusFanout::new("dev-1".into(), ImmediateContext::shared());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let callback: StatusCallback = Arc::new(move |_: &PlaybackStatus| {
            let _ = entered_tx.send(());
            let _ = release_rx.lock().recv_timeout(Duration::from_secs(2));
        });
        fanout.add_subscriber(SubscriptionId(1), ListenerRole::Status, callback);

        let emitter = {
            let fanout = Arc::clone(&fanout);
            thread::spawn(move || fanout.on_status_change(&playing(), 0))
        };
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let removed = Arc::new(AtomicBool::new(false));
        let remover = {
            let fanout = Arc::clone(&fanout);
            let removed = Arc::clone(&removed);
            thread::spawn(move || {
                fanout.remove();
                removed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!removed.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        emitter.join().unwrap();
        remover.join().unwrap();
        assert!(removed.load(Ordering::SeqCst));
    }
}
