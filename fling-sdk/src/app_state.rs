//! Host application foreground/background notifications
//!
//! The SDK cannot observe the host's lifecycle itself. The host calls
//! [`AppStateChangeNotifier::notify`] when it moves between foreground and
//! background; services registered with the notifier pause or resume their
//! status subscriptions in response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Foreground,
    Background,
}

pub type AppStateObserver = Arc<dyn Fn(AppState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppStateObserverId(u64);

/// Fans host lifecycle transitions out to registered observers
///
/// Observers run synchronously on the thread calling [`notify`](Self::notify).
pub struct AppStateChangeNotifier {
    state: Mutex<AppState>,
    observers: RwLock<Vec<(AppStateObserverId, AppStateObserver)>>,
    next_id: AtomicU64,
}

impl AppStateChangeNotifier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AppState::Foreground),
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn add_observer(&self, observer: AppStateObserver) -> AppStateObserverId {
        let id = AppStateObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    pub fn remove_observer(&self, id: AppStateObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Record a transition and tell every observer about it
    ///
    /// Repeating the current state notifies nobody.
    pub fn notify(&self, state: AppState) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }

        tracing::debug!("App state changed to {:?}", state);
        let observers: Vec<AppStateObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(state);
        }
    }

    pub fn current_state(&self) -> AppState {
        *self.state.lock()
    }
}

impl Default for AppStateChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppStateChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStateChangeNotifier")
            .field("state", &self.current_state())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
