//! In-memory players for tests
//!
//! [`FakeMediaPlayer`] implements [`RemoteMediaPlayer`] without a network. It
//! records every call, can be scripted to fail specific operations, and by
//! default completes each task on a freshly spawned `fling-vendor` thread, the
//! way the real SDK completes tasks on threads of its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::ApiError;
use crate::player::{same_listener, ApiTask, RemoteMediaPlayer, StatusListenerHandle};
use crate::status::{MediaCondition, MediaPlayerInfo, MediaPlayerStatus, MediaState, SeekMode};
use fling_runtime::Task;

/// Name of the threads fake players complete tasks on
pub const VENDOR_THREAD_NAME: &str = "fling-vendor";

/// How a fake player completes its tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Complete before the operation returns
    Inline,
    /// Complete on a separate vendor thread
    VendorThread,
}

/// A call recorded by [`FakeMediaPlayer`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    GetVolume,
    SetVolume(f64),
    IsMute,
    SetMute(bool),
    GetPosition,
    GetDuration,
    GetStatus,
    IsMimeTypeSupported(String),
    Pause,
    Play,
    Stop,
    Seek(i64, SeekMode),
    SetMediaSource {
        url: String,
        metadata: String,
        auto_play: bool,
        play_in_background: bool,
    },
    AddStatusListener,
    RemoveStatusListener,
    SetPositionUpdateInterval(i64),
    SendCommand(String),
    SetPlayerStyle(String),
    GetMediaInfo,
}

impl PlayerCall {
    /// Operation name used to script failures
    pub fn op_name(&self) -> &'static str {
        match self {
            PlayerCall::GetVolume => "get_volume",
            PlayerCall::SetVolume(_) => "set_volume",
            PlayerCall::IsMute => "is_mute",
            PlayerCall::SetMute(_) => "set_mute",
            PlayerCall::GetPosition => "get_position",
            PlayerCall::GetDuration => "get_duration",
            PlayerCall::GetStatus => "get_status",
            PlayerCall::IsMimeTypeSupported(_) => "is_mime_type_supported",
            PlayerCall::Pause => "pause",
            PlayerCall::Play => "play",
            PlayerCall::Stop => "stop",
            PlayerCall::Seek(..) => "seek_to_position",
            PlayerCall::SetMediaSource { .. } => "set_media_source",
            PlayerCall::AddStatusListener => "add_status_listener",
            PlayerCall::RemoveStatusListener => "remove_status_listener",
            PlayerCall::SetPositionUpdateInterval(_) => "set_position_update_interval",
            PlayerCall::SendCommand(_) => "send_command",
            PlayerCall::SetPlayerStyle(_) => "set_player_style",
            PlayerCall::GetMediaInfo => "get_media_info",
        }
    }
}

struct FakeState {
    volume: f64,
    mute: bool,
    position_ms: i64,
    duration_ms: i64,
    status: MediaPlayerStatus,
    media_info: MediaPlayerInfo,
    supported_mime_types: Vec<String>,
    failures: HashMap<&'static str, ApiError>,
    fail_all: Option<ApiError>,
    calls: Vec<PlayerCall>,
    listeners: Vec<StatusListenerHandle>,
}

/// Scriptable in-memory [`RemoteMediaPlayer`]
pub struct FakeMediaPlayer {
    id: String,
    name: String,
    completion: Completion,
    state: Mutex<FakeState>,
}

impl FakeMediaPlayer {
    /// Create a player completing tasks on vendor threads
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            completion: Completion::VendorThread,
            state: Mutex::new(FakeState {
                volume: 0.5,
                mute: false,
                position_ms: 0,
                duration_ms: 0,
                status: MediaPlayerStatus::new(MediaState::NoMedia, MediaCondition::Good),
                media_info: MediaPlayerInfo::default(),
                supported_mime_types: vec!["video/mp4".to_string(), "image/jpeg".to_string()],
                failures: HashMap::new(),
                fail_all: None,
                calls: Vec::new(),
                listeners: Vec::new(),
            }),
        }
    }

    /// Change how tasks are completed
    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Wrap the player for sharing
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Make every future call of `op` fail with `error`
    pub fn fail_operation(&self, op: &'static str, error: ApiError) {
        self.state.lock().failures.insert(op, error);
    }

    /// Make every future call fail with `error`
    pub fn fail_all(&self, error: ApiError) {
        self.state.lock().fail_all = Some(error);
    }

    /// Remove all scripted failures
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failures.clear();
        state.fail_all = None;
    }

    pub fn set_status(&self, status: MediaPlayerStatus) {
        self.state.lock().status = status;
    }

    pub fn set_position(&self, position_ms: i64) {
        self.state.lock().position_ms = position_ms;
    }

    pub fn set_duration(&self, duration_ms: i64) {
        self.state.lock().duration_ms = duration_ms;
    }

    pub fn set_media_info(&self, info: MediaPlayerInfo) {
        self.state.lock().media_info = info;
    }

    pub fn set_supported_mime_types(&self, mime_types: &[&str]) {
        self.state.lock().supported_mime_types =
            mime_types.iter().map(|m| m.to_string()).collect();
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().mute
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `op`
    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op_name() == op)
            .count()
    }

    /// Number of status listeners currently registered
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Deliver a status update to registered listeners on the calling thread
    pub fn emit_status(&self, status: &MediaPlayerStatus, position_ms: i64) {
        let listeners = self.state.lock().listeners.clone();
        for listener in listeners {
            listener.on_status_change(status, position_ms);
        }
    }

    fn finish<T, F>(&self, call: PlayerCall, apply: F) -> ApiTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FakeState) -> T,
    {
        let result = {
            let mut state = self.state.lock();
            let failure = state
                .fail_all
                .clone()
                .or_else(|| state.failures.get(call.op_name()).cloned());
            state.calls.push(call);

            match failure {
                Some(error) => Err(error),
                None => Ok(apply(&mut state)),
            }
        };

        match self.completion {
            Completion::Inline => Task::from_result(result),
            Completion::VendorThread => {
                let (source, task) = Task::pending();
                let spawned = thread::Builder::new()
                    .name(VENDOR_THREAD_NAME.to_string())
                    .spawn(move || source.complete(result));

                if let Err(e) = spawned {
                    tracing::warn!("Failed to spawn vendor thread, task abandoned: {}", e);
                }
                task
            }
        }
    }
}

impl RemoteMediaPlayer for FakeMediaPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_identifier(&self) -> &str {
        &self.id
    }

    fn get_volume(&self) -> ApiTask<f64> {
        self.finish(PlayerCall::GetVolume, |s| s.volume)
    }

    fn set_volume(&self, volume: f64) -> ApiTask<()> {
        self.finish(PlayerCall::SetVolume(volume), |s| s.volume = volume)
    }

    fn is_mute(&self) -> ApiTask<bool> {
        self.finish(PlayerCall::IsMute, |s| s.mute)
    }

    fn set_mute(&self, mute: bool) -> ApiTask<()> {
        self.finish(PlayerCall::SetMute(mute), |s| s.mute = mute)
    }

    fn get_position(&self) -> ApiTask<i64> {
        self.finish(PlayerCall::GetPosition, |s| s.position_ms)
    }

    fn get_duration(&self) -> ApiTask<i64> {
        self.finish(PlayerCall::GetDuration, |s| s.duration_ms)
    }

    fn get_status(&self) -> ApiTask<MediaPlayerStatus> {
        self.finish(PlayerCall::GetStatus, |s| s.status.clone())
    }

    fn is_mime_type_supported(&self, mime_type: &str) -> ApiTask<bool> {
        let mime = mime_type.to_string();
        self.finish(PlayerCall::IsMimeTypeSupported(mime.clone()), move |s| {
            s.supported_mime_types.contains(&mime)
        })
    }

    fn pause(&self) -> ApiTask<()> {
        self.finish(PlayerCall::Pause, |s| {
            s.status = MediaPlayerStatus::new(MediaState::Paused, MediaCondition::Good);
        })
    }

    fn play(&self) -> ApiTask<()> {
        self.finish(PlayerCall::Play, |s| {
            s.status = MediaPlayerStatus::new(MediaState::Playing, MediaCondition::Good);
        })
    }

    fn stop(&self) -> ApiTask<()> {
        self.finish(PlayerCall::Stop, |s| {
            s.status = MediaPlayerStatus::new(MediaState::NoMedia, MediaCondition::Good);
        })
    }

    fn seek_to_position(&self, position_ms: i64, mode: SeekMode) -> ApiTask<()> {
        self.finish(PlayerCall::Seek(position_ms, mode), move |s| {
            s.position_ms = match mode {
                SeekMode::Absolute => position_ms,
                SeekMode::Relative => s.position_ms + position_ms,
            };
        })
    }

    fn set_media_source(
        &self,
        url: &str,
        metadata: &str,
        auto_play: bool,
        play_in_background: bool,
    ) -> ApiTask<()> {
        let call = PlayerCall::SetMediaSource {
            url: url.to_string(),
            metadata: metadata.to_string(),
            auto_play,
            play_in_background,
        };
        let info = MediaPlayerInfo::new(url, metadata, "");

        self.finish(call, move |s| {
            s.media_info = info;
            s.position_ms = 0;
            let state = if auto_play {
                MediaState::Playing
            } else {
                MediaState::ReadyToPlay
            };
            s.status = MediaPlayerStatus::new(state, MediaCondition::Good);
        })
    }

    fn add_status_listener(&self, listener: StatusListenerHandle) -> ApiTask<()> {
        self.finish(PlayerCall::AddStatusListener, move |s| {
            s.listeners.push(listener);
        })
    }

    fn remove_status_listener(&self, listener: StatusListenerHandle) -> ApiTask<()> {
        self.finish(PlayerCall::RemoveStatusListener, move |s| {
            s.listeners.retain(|l| !same_listener(l, &listener));
        })
    }

    fn set_position_update_interval(&self, interval_ms: i64) -> ApiTask<()> {
        self.finish(PlayerCall::SetPositionUpdateInterval(interval_ms), |_| ())
    }

    fn send_command(&self, command: &str) -> ApiTask<()> {
        self.finish(PlayerCall::SendCommand(command.to_string()), |_| ())
    }

    fn set_player_style(&self, style_json: &str) -> ApiTask<()> {
        self.finish(PlayerCall::SetPlayerStyle(style_json.to_string()), |_| ())
    }

    fn get_media_info(&self) -> ApiTask<MediaPlayerInfo> {
        self.finish(PlayerCall::GetMediaInfo, |s| s.media_info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::MediaPlayerStatusListener;
    use fling_runtime::ImmediateContext;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Recorder(Mutex<Vec<i64>>);

    impl MediaPlayerStatusListener for Recorder {
        fn on_status_change(&self, _status: &MediaPlayerStatus, position_ms: i64) {
            self.0.lock().push(position_ms);
        }
    }

    #[test]
    fn test_completes_on_vendor_thread() {
        let player = FakeMediaPlayer::new("dev-1", "Living Room");
        let (tx, rx) = mpsc::channel();

        player
            .get_volume()
            .continue_with(ImmediateContext::shared(), move |result| {
                let name = thread::current().name().map(str::to_string);
                tx.send((result, name)).unwrap();
            });

        let (result, thread_name) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(result, Ok(0.5));
        assert_eq!(thread_name.as_deref(), Some(VENDOR_THREAD_NAME));
    }

    #[test]
    fn test_scripted_failure() {
        let player = FakeMediaPlayer::new("dev-1", "Den").with_completion(Completion::Inline);
        player.fail_operation("get_status", ApiError::remote("offline"));

        assert!(player.get_status().is_faulted());
        assert!(!player.get_volume().is_faulted());
        assert_eq!(player.call_count("get_status"), 1);
    }

    #[test]
    fn test_listener_registration() {
        let player = FakeMediaPlayer::new("dev-1", "Den").with_completion(Completion::Inline);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let handle: StatusListenerHandle = recorder.clone();

        let _ = player.add_status_listener(Arc::clone(&handle));
        assert_eq!(player.listener_count(), 1);

        let status = MediaPlayerStatus::new(MediaState::Playing, MediaCondition::Good);
        player.emit_status(&status, 1500);
        assert_eq!(*recorder.0.lock(), vec![1500]);

        let _ = player.remove_status_listener(handle);
        assert_eq!(player.listener_count(), 0);

        player.emit_status(&status, 3000);
        assert_eq!(*recorder.0.lock(), vec![1500]);
    }

    #[test]
    fn test_relative_seek() {
        let player = FakeMediaPlayer::new("dev-1", "Den").with_completion(Completion::Inline);
        player.set_position(10_000);

        let _ = player.seek_to_position(-2_000, SeekMode::Relative);
        let _ = player.seek_to_position(500, SeekMode::Relative);

        assert_eq!(player.state.lock().position_ms, 8_500);
    }
}
