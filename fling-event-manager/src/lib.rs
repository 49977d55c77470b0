//! # Fling Event Manager
//!
//! Lifecycle management for long-lived player status subscriptions.
//!
//! ## Overview
//!
//! Status subscriptions outlive individual calls: they must survive the host
//! application being backgrounded and foregrounded, and they must be torn
//! down explicitly because the callbacks usually capture the object that owns
//! the subscription. [`SubscriptionLifecycleManager`] is the single place that
//! mutates the subscription registry.
//!
//! ## Key Features
//!
//! - **One vendor listener per device**: any number of role subscriptions
//!   ([`ListenerRole`]) share a single registration with the player
//! - **Pause/resume without re-subscribing**: pausing detaches the vendor
//!   listener and keeps the bookkeeping, resuming re-attaches it
//! - **Explicit teardown**: [`unsubscribe_all`](SubscriptionLifecycleManager::unsubscribe_all)
//!   drops every callback for a device; `Removed` is terminal
//! - **Late updates are dropped**: every update is checked against the current
//!   state before and after it is queued on the callback context
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fling_event_manager::{ListenerRole, SubscriptionLifecycleManager};
//!
//! let manager = SubscriptionLifecycleManager::with_default_context();
//! let subscribed = manager.subscribe(&device, ListenerRole::Status, Arc::new(|status| {
//!     println!("{:?} at {}ms", status.play_state(), status.position_ms);
//! }));
//!
//! manager.pause(device.unique_identifier());
//! manager.resume(device.unique_identifier());
//! manager.unsubscribe_all(device.unique_identifier());
//! ```
//!
//! ## Lock discipline
//!
//! Vendor attach and detach calls for a device are serialized by a
//! per-device transition lock. The registry lock is never held while calling
//! into the vendor, and the delivery path never takes it.

mod fanout;
pub mod manager;
pub mod subscription;

// Re-export main types for convenience
pub use manager::{Subscribed, SubscriptionLifecycleManager};
pub use subscription::{
    ListenerRole, StatusCallback, Subscription, SubscriptionId, SubscriptionState,
};
