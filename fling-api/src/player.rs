//! Remote media player contract
//!
//! [`RemoteMediaPlayer`] is the device command interface exposed by the vendor
//! SDK. Every command is asynchronous and returns an [`ApiTask`] that completes
//! exactly once, on a thread chosen by the vendor.

use std::fmt;
use std::sync::Arc;

use fling_runtime::Task;

use crate::error::ApiError;
use crate::status::{MediaPlayerInfo, MediaPlayerStatus, SeekMode};

/// Single-shot result of a vendor operation
pub type ApiTask<T> = Task<T, ApiError>;

/// Shared, non-owning reference to a vendor-controlled device
///
/// Devices are owned by the discovery layer; everything else holds clones of
/// this handle for as long as it needs the device.
pub type DeviceHandle = Arc<dyn RemoteMediaPlayer>;

/// Listener for playback status changes and position updates
pub trait MediaPlayerStatusListener: Send + Sync {
    /// Called on status changes and position updates
    ///
    /// `position_ms` is the playback position in milliseconds from the start.
    fn on_status_change(&self, status: &MediaPlayerStatus, position_ms: i64);
}

/// Shared status listener as registered with a player
pub type StatusListenerHandle = Arc<dyn MediaPlayerStatusListener>;

/// A remote device's media player
///
/// The vendor currently supports a single status listener per player.
pub trait RemoteMediaPlayer: Send + Sync {
    /// Display name of the device
    fn name(&self) -> &str;

    /// Unique identifier (UUID) of the device
    fn unique_identifier(&self) -> &str;

    /// Current volume between 0.0 (mute) and 1.0 (full)
    fn get_volume(&self) -> ApiTask<f64>;

    /// Set the volume between 0.0 and 1.0
    fn set_volume(&self, volume: f64) -> ApiTask<()>;

    fn is_mute(&self) -> ApiTask<bool>;

    fn set_mute(&self, mute: bool) -> ApiTask<()>;

    /// Playback position from start, in milliseconds
    fn get_position(&self) -> ApiTask<i64>;

    /// Duration of the current clip, in milliseconds, if known
    fn get_duration(&self) -> ApiTask<i64>;

    fn get_status(&self) -> ApiTask<MediaPlayerStatus>;

    fn is_mime_type_supported(&self, mime_type: &str) -> ApiTask<bool>;

    /// Pause playback; does nothing if already paused
    fn pause(&self) -> ApiTask<()>;

    fn play(&self) -> ApiTask<()>;

    fn stop(&self) -> ApiTask<()>;

    /// Seek within the current stream
    fn seek_to_position(&self, position_ms: i64, mode: SeekMode) -> ApiTask<()>;

    /// Set the URL to stream from
    ///
    /// `metadata` is a JSON document describing the clip. `play_in_background`
    /// suppresses any UI on the target device.
    fn set_media_source(
        &self,
        url: &str,
        metadata: &str,
        auto_play: bool,
        play_in_background: bool,
    ) -> ApiTask<()>;

    fn add_status_listener(&self, listener: StatusListenerHandle) -> ApiTask<()>;

    fn remove_status_listener(&self, listener: StatusListenerHandle) -> ApiTask<()>;

    /// Interval for position updates while playing; `0` disables them
    fn set_position_update_interval(&self, interval_ms: i64) -> ApiTask<()>;

    /// Send a player-dependent command string
    fn send_command(&self, command: &str) -> ApiTask<()>;

    /// Set the player style from a JSON document
    fn set_player_style(&self, style_json: &str) -> ApiTask<()>;

    fn get_media_info(&self) -> ApiTask<MediaPlayerInfo>;
}

impl fmt::Debug for dyn RemoteMediaPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMediaPlayer")
            .field("name", &self.name())
            .field("unique_identifier", &self.unique_identifier())
            .finish()
    }
}

/// Whether two listener handles refer to the same listener
pub fn same_listener(a: &StatusListenerHandle, b: &StatusListenerHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
