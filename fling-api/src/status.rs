//! Vendor value types: player state, condition, status and media info

use serde::{Deserialize, Serialize};

/// What the remote media player is doing
///
/// Discriminants match the vendor's raw state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MediaState {
    NoMedia = 0,
    PreparingMedia = 1,
    ReadyToPlay = 2,
    Playing = 3,
    Paused = 4,
    Seeking = 5,
    Finished = 6,
    Error = 7,
}

impl MediaState {
    /// All defined states, in code order
    pub const ALL: [MediaState; 8] = [
        MediaState::NoMedia,
        MediaState::PreparingMedia,
        MediaState::ReadyToPlay,
        MediaState::Playing,
        MediaState::Paused,
        MediaState::Seeking,
        MediaState::Finished,
        MediaState::Error,
    ];

    /// Decode a raw vendor state code
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Raw vendor state code
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Error or warning condition of the remote media player
///
/// An error condition only accompanies [`MediaState::Error`]; warnings may
/// co-exist with any state, usually [`MediaState::Playing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MediaCondition {
    Good = 0,
    WarningContent = 1,
    WarningBandwidth = 2,
    ErrorContent = 3,
    ErrorChannel = 4,
    ErrorUnknown = 5,
}

impl MediaCondition {
    /// All defined conditions, in code order
    pub const ALL: [MediaCondition; 6] = [
        MediaCondition::Good,
        MediaCondition::WarningContent,
        MediaCondition::WarningBandwidth,
        MediaCondition::ErrorContent,
        MediaCondition::ErrorChannel,
        MediaCondition::ErrorUnknown,
    ];

    /// Decode a raw vendor condition code
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Raw vendor condition code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether this is one of the error conditions
    pub fn is_error(self) -> bool {
        matches!(
            self,
            MediaCondition::ErrorContent | MediaCondition::ErrorChannel | MediaCondition::ErrorUnknown
        )
    }
}

/// Raw status as reported by the vendor
///
/// State and condition are kept as raw codes because the vendor may report
/// values this crate does not know about. Mute and volume are optional: the
/// player only fills them in when they changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlayerStatus {
    state_code: u32,
    condition_code: u32,
    mute: Option<bool>,
    volume: Option<f64>,
}

impl MediaPlayerStatus {
    /// Create a status from known state and condition values
    pub fn new(state: MediaState, condition: MediaCondition) -> Self {
        Self::from_codes(state.code(), condition.code())
    }

    /// Create a status from raw vendor codes
    pub fn from_codes(state_code: u32, condition_code: u32) -> Self {
        Self {
            state_code,
            condition_code,
            mute: None,
            volume: None,
        }
    }

    /// Set the optional mute flag
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = Some(mute);
        self
    }

    /// Set the optional volume (0.0 - 1.0)
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Decoded state, `None` for codes this crate does not know
    pub fn state(&self) -> Option<MediaState> {
        MediaState::from_code(self.state_code)
    }

    /// Raw state code
    pub fn state_code(&self) -> u32 {
        self.state_code
    }

    /// Decoded condition, `None` for codes this crate does not know
    pub fn condition(&self) -> Option<MediaCondition> {
        MediaCondition::from_code(self.condition_code)
    }

    /// Raw condition code
    pub fn condition_code(&self) -> u32 {
        self.condition_code
    }

    /// Mute flag, if the player reported it
    pub fn mute(&self) -> Option<bool> {
        self.mute
    }

    /// Volume, if the player reported it
    pub fn volume(&self) -> Option<f64> {
        self.volume
    }
}

/// Seek mode for [`seek_to_position`](crate::RemoteMediaPlayer::seek_to_position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeekMode {
    /// Seek to the given position
    Absolute,
    /// Seek from the current position by the given interval
    Relative,
}

/// Information about the media currently loaded on the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPlayerInfo {
    /// Identifier of the clip, usually its URL
    pub source: String,
    /// Metadata JSON supplied when the media source was set
    pub metadata: String,
    /// Application specific JSON
    pub extra: String,
}

impl MediaPlayerInfo {
    pub fn new(
        source: impl Into<String>,
        metadata: impl Into<String>,
        extra: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            metadata: metadata.into(),
            extra: extra.into(),
        }
    }
}
