//! # Fling State
//!
//! Normalization of raw vendor player status into the values callers see.
//!
//! - [`PlayState`]: the play state mapper. Total over every vendor state code;
//!   codes it does not recognize map to [`PlayState::Error`]
//! - [`PlaybackStatus`]: a full status snapshot (state, condition, optional
//!   mute and volume, position) derived from each vendor status update
//! - [`logging`]: subscriber setup shared by the whole SDK
//!
//! ```rust
//! use fling_api::{MediaCondition, MediaPlayerStatus, MediaState};
//! use fling_state::{PlayState, PlaybackStatus};
//!
//! let raw = MediaPlayerStatus::new(MediaState::Seeking, MediaCondition::Good);
//! let status = PlaybackStatus::from_vendor(&raw, 42_000);
//!
//! assert_eq!(status.play_state(), PlayState::Buffering);
//! assert_eq!(PlayState::from_state_code(1000), PlayState::Error);
//! ```

pub mod logging;
pub mod model;

pub use logging::{init_logging, init_logging_from_env, init_silent, LoggingError, LoggingMode};
pub use model::{PlayState, PlaybackStatus};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::model::{PlayState, PlaybackStatus};
}
