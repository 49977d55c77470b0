//! Normalized playback status

use fling_api::{MediaCondition, MediaPlayerStatus, MediaState};
use serde::{Deserialize, Serialize};

use super::PlayState;

/// Snapshot of a player derived from one raw vendor status
///
/// Built fresh for every update; never stored by the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: MediaState,
    pub condition: MediaCondition,
    pub mute: Option<bool>,
    /// Volume between 0.0 and 1.0
    pub volume: Option<f64>,
    /// Playback position in milliseconds
    pub position_ms: u64,
}

impl PlaybackStatus {
    /// Normalize a raw vendor status
    ///
    /// Unknown state codes become [`MediaState::Error`] and unknown condition
    /// codes become [`MediaCondition::ErrorUnknown`]. Volume is clamped to
    /// 0.0 - 1.0 and negative positions are reported as 0.
    pub fn from_vendor(status: &MediaPlayerStatus, position_ms: i64) -> Self {
        let volume = status
            .volume()
            .filter(|v| !v.is_nan())
            .map(|v| v.clamp(0.0, 1.0));

        Self {
            state: status.state().unwrap_or(MediaState::Error),
            condition: status.condition().unwrap_or(MediaCondition::ErrorUnknown),
            mute: status.mute(),
            volume,
            position_ms: position_ms.max(0) as u64,
        }
    }

    /// The normalized play state
    pub fn play_state(&self) -> PlayState {
        PlayState::from_media_state(self.state)
    }

    /// Whether the player reported an error condition
    pub fn has_error(&self) -> bool {
        self.state == MediaState::Error || self.condition.is_error()
    }
}
