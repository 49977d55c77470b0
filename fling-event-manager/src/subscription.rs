//! Subscription identifiers, roles and handles

use std::fmt;
use std::sync::{Arc, Weak};

use fling_state::PlaybackStatus;

use crate::manager::ManagerInner;

/// Callback receiving normalized status updates
pub type StatusCallback = Arc<dyn Fn(&PlaybackStatus) + Send + Sync>;

/// Unique identifier of a bridge-side subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a subscription listens for
///
/// A device holds at most one subscription per role. Subscribing again with
/// the same role returns the existing subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    PlayState,
    Status,
    Volume,
    Mute,
    /// Application defined role
    Named(String),
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerRole::PlayState => write!(f, "play-state"),
            ListenerRole::Status => write!(f, "status"),
            ListenerRole::Volume => write!(f, "volume"),
            ListenerRole::Mute => write!(f, "mute"),
            ListenerRole::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Lifecycle state of a device's subscriptions
///
/// ```text
///   subscribe        pause           resume
///  ─────────► Active ──────► Paused ───────► Active
///               │              │
///               └──────┬───────┘
///                      ▼ unsubscribe_all
///                   Removed  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// The vendor listener is attached and updates are delivered
    Active,
    /// The vendor listener is detached; bookkeeping is retained
    Paused,
    /// Torn down; never resumes
    Removed,
}

/// Handle to one role subscription on one device
///
/// Dropping the handle does not unsubscribe. Teardown is explicit, through
/// [`Subscription::unsubscribe`] or
/// [`SubscriptionLifecycleManager::unsubscribe_all`](crate::SubscriptionLifecycleManager::unsubscribe_all).
#[derive(Clone)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) role: ListenerRole,
    pub(crate) device_id: String,
    pub(crate) manager: Weak<ManagerInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn role(&self) -> &ListenerRole {
        &self.role
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current state; `Removed` once the manager is gone
    pub fn state(&self) -> SubscriptionState {
        match self.manager.upgrade() {
            Some(inner) => inner.subscription_state(self.id),
            None => SubscriptionState::Removed,
        }
    }

    /// Remove this subscription
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        match self.manager.upgrade() {
            Some(inner) => inner.unsubscribe(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("device_id", &self.device_id)
            .finish()
    }
}
