//! Loading media onto a player

use std::sync::Arc;

use fling_api::MediaPlayerInfo;
use fling_event_manager::Subscription;
use serde::{Deserialize, Serialize};

use super::media_control::{FireTvMediaControl, MediaControl};
use super::mixin::{Capability, CapabilityMixin};
use crate::bridge::{FailureHandler, SuccessHandler, UpdateHandler};
use crate::error::ServiceError;

/// What to play or display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub url: String,
    pub mime_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// URL of an image shown while the media loads
    pub poster: Option<String>,
}

impl MediaInfo {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: Some(mime_type.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    /// Metadata document handed to the player along with the URL
    fn metadata_json(&self) -> Result<String, ServiceError> {
        let metadata = MediaMetadata {
            mime_type: self.mime_type.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            poster: self.poster.clone(),
            no_replay: true,
        };
        serde_json::to_string(&metadata)
            .map_err(|e| ServiceError::invalid_argument(format!("unencodable metadata: {e}")))
    }
}

/// Metadata document stored with the media on the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "noreplay", default)]
    pub no_replay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

/// A successfully loaded piece of media
#[derive(Clone)]
pub struct MediaSession {
    pub media_url: String,
    pub kind: MediaKind,
    pub media_control: Arc<dyn MediaControl>,
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("media_url", &self.media_url)
            .field("kind", &self.kind)
            .finish()
    }
}

pub trait MediaPlayer: Send + Sync {
    /// Load `media` and start playing it
    fn play_media(
        &self,
        media: MediaInfo,
        success: Option<SuccessHandler<MediaSession>>,
        failure: Option<FailureHandler>,
    );

    fn display_image(
        &self,
        media: MediaInfo,
        success: Option<SuccessHandler<MediaSession>>,
        failure: Option<FailureHandler>,
    );

    fn close_media(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn get_media_info(
        &self,
        success: Option<SuccessHandler<MediaPlayerInfo>>,
        failure: Option<FailureHandler>,
    );

    /// Metadata of the loaded media, parsed from [`MediaPlayerInfo::metadata`]
    fn get_media_metadata(
        &self,
        success: Option<SuccessHandler<MediaMetadata>>,
        failure: Option<FailureHandler>,
    );

    fn is_mime_type_supported(
        &self,
        mime_type: &str,
        success: Option<SuccessHandler<bool>>,
        failure: Option<FailureHandler>,
    );

    fn subscribe_media_info(
        &self,
        on_update: UpdateHandler<MediaPlayerInfo>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription>;
}

/// [`MediaPlayer`] backed by a Fire TV player
pub struct FireTvMediaPlayer {
    media_control: Arc<FireTvMediaControl>,
}

impl FireTvMediaPlayer {
    pub fn new(media_control: Arc<FireTvMediaControl>) -> Self {
        Self { media_control }
    }

    /// Send a player-dependent command string
    pub fn send_command(
        &self,
        command: &str,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().send_command(command), success, failure);
    }

    /// Set the player style from a JSON document
    pub fn set_player_style(
        &self,
        style_json: &str,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().set_player_style(style_json), success, failure);
    }

    fn load(
        &self,
        media: MediaInfo,
        kind: MediaKind,
        success: Option<SuccessHandler<MediaSession>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        let metadata = match media.metadata_json() {
            Ok(metadata) => metadata,
            Err(error) => return mixin.bridge().fail(failure, error),
        };

        tracing::debug!("Loading {:?} {} on {}", kind, media.url, mixin.device_id());
        let task = mixin
            .device()
            .set_media_source(&media.url, &metadata, true, false);

        let media_control: Arc<dyn MediaControl> = self.media_control.clone();
        mixin.bridge().continue_task_mapped(
            Some(task),
            move |()| MediaSession {
                media_url: media.url,
                kind,
                media_control,
            },
            success,
            failure,
        );
    }
}

impl Capability for FireTvMediaPlayer {
    fn mixin(&self) -> &Arc<CapabilityMixin> {
        self.media_control.mixin()
    }
}

impl MediaPlayer for FireTvMediaPlayer {
    fn play_media(
        &self,
        media: MediaInfo,
        success: Option<SuccessHandler<MediaSession>>,
        failure: Option<FailureHandler>,
    ) {
        let kind = match media.mime_type.as_deref() {
            Some(mime) if mime.starts_with("audio/") => MediaKind::Audio,
            _ => MediaKind::Video,
        };
        self.load(media, kind, success, failure);
    }

    fn display_image(
        &self,
        media: MediaInfo,
        success: Option<SuccessHandler<MediaSession>>,
        failure: Option<FailureHandler>,
    ) {
        self.load(media, MediaKind::Image, success, failure);
    }

    fn close_media(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.media_control.stop(success, failure);
    }

    fn get_media_info(
        &self,
        success: Option<SuccessHandler<MediaPlayerInfo>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().get_media_info(), success, failure);
    }

    fn get_media_metadata(
        &self,
        success: Option<SuccessHandler<MediaMetadata>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.bridge().continue_task_try_mapped(
            Some(mixin.device().get_media_info()),
            |info| parse_metadata(&info.metadata),
            success,
            failure,
        );
    }

    fn is_mime_type_supported(
        &self,
        mime_type: &str,
        success: Option<SuccessHandler<bool>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().is_mime_type_supported(mime_type), success, failure);
    }

    fn subscribe_media_info(
        &self,
        _on_update: UpdateHandler<MediaPlayerInfo>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription> {
        self.mixin().fail_unsupported(failure, "subscribe_media_info");
        None
    }
}

fn parse_metadata(metadata: &str) -> Result<MediaMetadata, ServiceError> {
    if metadata.trim().is_empty() {
        return Ok(MediaMetadata::default());
    }
    serde_json::from_str(metadata).map_err(|e| ServiceError::MalformedMetadata(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fling_api::testing::{Completion, FakeMediaPlayer, PlayerCall};
    use fling_api::DeviceHandle;
    use fling_event_manager::SubscriptionLifecycleManager;
    use fling_runtime::ImmediateContext;
    use std::sync::mpsc;

    fn media_player(player: &Arc<FakeMediaPlayer>) -> FireTvMediaPlayer {
        let device: DeviceHandle = player.clone();
        let context = ImmediateContext::shared();
        let mixin = Arc::new(CapabilityMixin::new(device, context.clone()));
        FireTvMediaPlayer::new(Arc::new(FireTvMediaControl::new(
            mixin,
            SubscriptionLifecycleManager::new(context),
            None,
        )))
    }

    fn inline_player() -> Arc<FakeMediaPlayer> {
        FakeMediaPlayer::new("tv-1", "Bedroom")
            .with_completion(Completion::Inline)
            .shared()
    }

    #[test]
    fn test_play_media_sets_source_with_metadata() {
        let player = inline_player();
        let (tx, rx) = mpsc::channel();

        media_player(&player).play_media(
            MediaInfo::new("http://example.com/clip.mp4", "video/mp4").with_title("Clip"),
            Some(Box::new(move |session: MediaSession| tx.send(session).unwrap())),
            None,
        );

        let session = rx.try_recv().unwrap();
        assert_eq!(session.media_url, "http://example.com/clip.mp4");
        assert_eq!(session.kind, MediaKind::Video);

        let calls = player.calls();
        let Some(PlayerCall::SetMediaSource {
            url,
            metadata,
            auto_play,
            play_in_background,
        }) = calls.first()
        else {
            panic!("expected set_media_source, got {:?}", calls);
        };
        assert_eq!(url, "http://example.com/clip.mp4");
        assert!(*auto_play);
        assert!(!*play_in_background);

        let json: serde_json::Value = serde_json::from_str(metadata).unwrap();
        assert_eq!(json["type"], "video/mp4");
        assert_eq!(json["title"], "Clip");
        assert_eq!(json["noreplay"], true);
        assert!(json.get("poster").is_none());
    }

    #[test]
    fn test_display_image_kind() {
        let player = inline_player();
        let (tx, rx) = mpsc::channel();

        media_player(&player).display_image(
            MediaInfo::new("http://example.com/photo.jpg", "image/jpeg"),
            Some(Box::new(move |session: MediaSession| tx.send(session.kind).unwrap())),
            None,
        );

        assert_eq!(rx.try_recv().unwrap(), MediaKind::Image);
    }

    #[test]
    fn test_close_media_stops() {
        let player = inline_player();

        media_player(&player).close_media(None, None);

        assert_eq!(player.call_count("stop"), 1);
    }

    #[test]
    fn test_media_metadata_parsed() {
        let player = inline_player();
        player.set_media_info(MediaPlayerInfo::new(
            "http://example.com/clip.mp4",
            r#"{"type":"video/mp4","title":"Clip","noreplay":true}"#,
            "",
        ));
        let (tx, rx) = mpsc::channel();

        media_player(&player).get_media_metadata(
            Some(Box::new(move |m: MediaMetadata| tx.send(m).unwrap())),
            None,
        );

        let metadata = rx.try_recv().unwrap();
        assert_eq!(metadata.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(metadata.title.as_deref(), Some("Clip"));
        assert!(metadata.no_replay);
    }

    #[test]
    fn test_malformed_metadata_fails() {
        let player = inline_player();
        player.set_media_info(MediaPlayerInfo::new("x", "{not json", ""));
        let (tx, rx) = mpsc::channel();

        media_player(&player).get_media_metadata(
            None,
            Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())),
        );

        assert!(matches!(rx.try_recv().unwrap(), ServiceError::MalformedMetadata(_)));
    }

    #[test]
    fn test_mime_type_support() {
        let player = inline_player();
        player.set_supported_mime_types(&["video/mp4"]);
        let (tx, rx) = mpsc::channel();
        let second = tx.clone();
        let media_player = media_player(&player);

        media_player.is_mime_type_supported(
            "video/mp4",
            Some(Box::new(move |s: bool| tx.send(s).unwrap())),
            None,
        );
        media_player.is_mime_type_supported(
            "audio/flac",
            Some(Box::new(move |s: bool| second.send(s).unwrap())),
            None,
        );

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![true, false]);
    }

    #[test]
    fn test_media_info_subscription_unsupported() {
        let player = inline_player();
        let (tx, rx) = mpsc::channel();

        let subscription = media_player(&player).subscribe_media_info(
            Arc::new(|_| {}),
            Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())),
        );

        assert!(subscription.is_none());
        assert!(matches!(rx.try_recv().unwrap(), ServiceError::UnsupportedOperation(_)));
    }
}
