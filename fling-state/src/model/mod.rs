//! Model types for fling-state

mod play_state;
mod playback_status;

pub use play_state::PlayState;
pub use playback_status::PlaybackStatus;
