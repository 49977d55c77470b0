//! Normalized play state

use fling_api::MediaState;
use serde::{Deserialize, Serialize};

/// What a player is doing, as presented to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayState {
    /// Nothing loaded, or loaded but not started
    #[default]
    Idle,
    /// Preparing media or seeking
    Buffering,
    Playing,
    Paused,
    /// Reached the end of the media
    Finished,
    /// The player failed or reported a state this crate does not know
    Error,
}

impl PlayState {
    /// Map a vendor media state
    pub fn from_media_state(state: MediaState) -> Self {
        match state {
            MediaState::NoMedia => PlayState::Idle,
            MediaState::PreparingMedia => PlayState::Buffering,
            MediaState::ReadyToPlay => PlayState::Idle,
            MediaState::Playing => PlayState::Playing,
            MediaState::Paused => PlayState::Paused,
            MediaState::Seeking => PlayState::Buffering,
            MediaState::Finished => PlayState::Finished,
            MediaState::Error => PlayState::Error,
        }
    }

    /// Map a raw vendor state code
    ///
    /// Unknown codes map to [`PlayState::Error`] so they are never shown as a
    /// healthy state.
    pub fn from_state_code(code: u32) -> Self {
        MediaState::from_code(code)
            .map(Self::from_media_state)
            .unwrap_or(PlayState::Error)
    }

    /// Whether media is actively playing
    pub fn is_playing(self) -> bool {
        self == PlayState::Playing
    }
}

impl From<MediaState> for PlayState {
    fn from(state: MediaState) -> Self {
        Self::from_media_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MediaState::NoMedia, PlayState::Idle)]
    #[case(MediaState::PreparingMedia, PlayState::Buffering)]
    #[case(MediaState::ReadyToPlay, PlayState::Idle)]
    #[case(MediaState::Playing, PlayState::Playing)]
    #[case(MediaState::Paused, PlayState::Paused)]
    #[case(MediaState::Seeking, PlayState::Buffering)]
    #[case(MediaState::Finished, PlayState::Finished)]
    #[case(MediaState::Error, PlayState::Error)]
    fn test_from_media_state(#[case] state: MediaState, #[case] expected: PlayState) {
        assert_eq!(PlayState::from_media_state(state), expected);
        assert_eq!(PlayState::from_state_code(state.code()), expected);
    }

    #[test]
    fn test_unknown_code_is_error() {
        assert_eq!(PlayState::from_state_code(8), PlayState::Error);
        assert_eq!(PlayState::from_state_code(u32::MAX), PlayState::Error);
    }

    #[test]
    fn test_default() {
        assert_eq!(PlayState::default(), PlayState::Idle);
        assert!(!PlayState::default().is_playing());
    }
}
