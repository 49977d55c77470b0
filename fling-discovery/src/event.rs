use fling_api::DeviceHandle;

/// Normalized discovery event
///
/// Republished by the [`DiscoveryNormalizer`](crate::DiscoveryNormalizer) on
/// its callback context.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A device was seen for the first time in this session
    DeviceFound(DeviceHandle),
    /// A known device was reported again
    DeviceUpdated(DeviceHandle),
    /// A device went away; may arrive for devices never reported as found
    DeviceLost(DeviceHandle),
    /// The vendor search stopped; terminal for the session
    DiscoveryFailed,
}

impl DiscoveryEvent {
    /// The device the event is about, if any
    pub fn device(&self) -> Option<&DeviceHandle> {
        match self {
            DiscoveryEvent::DeviceFound(device)
            | DiscoveryEvent::DeviceUpdated(device)
            | DiscoveryEvent::DeviceLost(device) => Some(device),
            DiscoveryEvent::DiscoveryFailed => None,
        }
    }

    /// Unique identifier of the device the event is about
    pub fn device_id(&self) -> Option<&str> {
        self.device().map(|device| device.unique_identifier())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryEvent::DeviceFound(_) => "found",
            DiscoveryEvent::DeviceUpdated(_) => "updated",
            DiscoveryEvent::DeviceLost(_) => "lost",
            DiscoveryEvent::DiscoveryFailed => "failed",
        }
    }
}
