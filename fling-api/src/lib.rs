//! Vendor-facing contracts for Fling media players
//!
//! This crate describes the surface of the vendor SDK the bridge consumes:
//! remote media players, their status values, and discovery controllers. The
//! vendor completes every operation through a [`Task`](fling_runtime::Task) on
//! a thread of its own choosing; nothing here decides where results land.
//!
//! # Modules
//!
//! - [`player`]: [`RemoteMediaPlayer`] and status listeners
//! - [`status`]: raw [`MediaPlayerStatus`] with state and condition codes
//! - [`discovery`]: [`DiscoveryController`] and [`DiscoveryListener`]
//! - `testing` (feature `test-support`): an in-memory [`RemoteMediaPlayer`]

pub mod discovery;
pub mod error;
pub mod player;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use discovery::{DiscoveryController, DiscoveryListener, DiscoveryListenerHandle};
pub use error::{ApiError, Result};
pub use player::{
    same_listener, ApiTask, DeviceHandle, MediaPlayerStatusListener, RemoteMediaPlayer,
    StatusListenerHandle,
};
pub use status::{MediaCondition, MediaPlayerInfo, MediaPlayerStatus, MediaState, SeekMode};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ApiError, ApiTask, DeviceHandle, DiscoveryController, DiscoveryListener, MediaCondition,
        MediaPlayerStatus, MediaPlayerStatusListener, MediaState, RemoteMediaPlayer, SeekMode,
    };
}
