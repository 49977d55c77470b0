//! Capability facades for a single device
//!
//! Each facade holds an `Arc<CapabilityMixin>` and issues vendor calls
//! through it. Facades are cheap to share and hold no state of their own
//! beyond the subscription manager used for status-derived callbacks.

mod media_control;
mod media_player;
mod mixin;
mod volume_control;

pub use media_control::{FireTvMediaControl, MediaControl};
pub use media_player::{
    FireTvMediaPlayer, MediaInfo, MediaKind, MediaMetadata, MediaPlayer, MediaSession,
};
pub use mixin::{Capability, CapabilityMixin};
pub use volume_control::{FireTvVolumeControl, VolumeControl};
