//! Discovery controller contract

use std::sync::Arc;

use crate::player::DeviceHandle;

/// Listener notified by a [`DiscoveryController`]
///
/// Callbacks may arrive on any thread the vendor chooses.
pub trait DiscoveryListener: Send + Sync {
    /// A player was discovered or its description was updated
    fn device_discovered(&self, device: DeviceHandle);

    /// A player is no longer reachable
    fn device_lost(&self, device: DeviceHandle);

    /// Discovery stopped working
    fn discovery_failure(&self);
}

/// Shared discovery listener as registered with a controller
pub type DiscoveryListenerHandle = Arc<dyn DiscoveryListener>;

/// Vendor controller that searches the local network for players
pub trait DiscoveryController: Send + Sync {
    /// Start searching for the built-in player
    fn search_default_player(&self, listener: DiscoveryListenerHandle);

    /// Start searching for a custom player with the given service id
    fn search_player(&self, service_id: &str, listener: DiscoveryListenerHandle);

    /// Resume a previously started search
    fn resume(&self);

    /// Stop searching and clean up
    fn close(&self);
}
