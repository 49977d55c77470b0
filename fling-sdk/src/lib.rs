//! # Fling SDK - callback-style control of Fire TV players
//!
//! Discovers Fire TV players through the Amazon Fling discovery controller
//! and exposes each one as a [`FireTvService`] with three capability facades:
//!
//! - [`MediaControl`]: play, pause, stop, seek, position, duration and status
//! - [`MediaPlayer`]: load media, display images, read media info
//! - [`VolumeControl`]: volume and mute
//!
//! Every operation takes an optional success handler and an optional failure
//! handler. Exactly one of them fires, on the service's callback context,
//! never on the vendor's own thread.
//!
//! ```rust,ignore
//! use fling_sdk::prelude::*;
//!
//! fling_sdk::init(&SdkConfig::development(), None)?;
//!
//! let system = FlingSystem::new(controller, &SdkConfig::default());
//! system.add_observer(Arc::new(|event: &DiscoveryEvent| {
//!     if let DiscoveryEvent::DeviceFound(device) = event {
//!         println!("found {}", device.name());
//!     }
//! }));
//! system.start()?;
//!
//! let service = system.require_service("2c7a1d52-...")?;
//! service.volume_control().set_volume(
//!     0.5,
//!     Some(Box::new(|()| println!("volume set"))),
//!     Some(Box::new(|error| eprintln!("failed: {error}"))),
//! );
//!
//! // Before dropping anything the status callbacks captured
//! service.disconnect();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! fling-sdk (FlingSystem, FireTvService, capability facades, AsyncResultBridge)
//!     ↓
//! fling-discovery (DiscoveryNormalizer)   fling-event-manager (SubscriptionLifecycleManager)
//!     ↓                                       ↓
//! fling-state (PlayState, PlaybackStatus, logging)
//!     ↓
//! fling-api (vendor contracts)  →  fling-runtime (ExecutionContext, Task)
//! ```

pub mod app_state;
pub mod bridge;
pub mod capability;
pub mod config;
pub mod error;
mod init;
pub mod service;
pub mod system;

pub use app_state::{AppState, AppStateChangeNotifier, AppStateObserver, AppStateObserverId};
pub use bridge::{AsyncResultBridge, FailureHandler, SuccessHandler, UpdateHandler};
pub use capability::{
    Capability, CapabilityMixin, FireTvMediaControl, FireTvMediaPlayer, FireTvVolumeControl,
    MediaControl, MediaInfo, MediaKind, MediaMetadata, MediaPlayer, MediaSession, VolumeControl,
};
pub use config::SdkConfig;
pub use error::{SdkError, ServiceError};
pub use init::init;
pub use service::{FireTvService, ServiceDelegate, ServiceOptions, FIRETV_SERVICE_ID};
pub use system::FlingSystem;

// Re-export commonly used types from the lower layers
pub use fling_api::{
    ApiError, DeviceHandle, DiscoveryController, MediaCondition, MediaPlayerInfo, MediaState,
    RemoteMediaPlayer,
};
pub use fling_discovery::{DiscoveryConfig, DiscoveryEvent, SearchTarget, SessionState};
pub use fling_event_manager::{ListenerRole, Subscription, SubscriptionState};
pub use fling_runtime::{
    ExecutionContext, ImmediateContext, SerialContext, SharedContext, TokioContext,
};
pub use fling_state::{LoggingMode, PlayState, PlaybackStatus};

#[cfg(feature = "test-support")]
pub use fling_api::testing;

pub mod prelude {
    pub use crate::{
        DiscoveryEvent, FireTvService, FlingSystem, MediaControl, MediaInfo, MediaPlayer,
        PlayState, PlaybackStatus, SdkConfig, ServiceError, SharedContext, VolumeControl,
    };
    pub use std::sync::Arc;
}
