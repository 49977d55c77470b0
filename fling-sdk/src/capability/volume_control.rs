//! Volume and mute control

use std::sync::Arc;

use fling_event_manager::{ListenerRole, StatusCallback, Subscription};
use fling_state::PlaybackStatus;

use super::media_control::FireTvMediaControl;
use super::mixin::{Capability, CapabilityMixin};
use crate::bridge::{FailureHandler, SuccessHandler, UpdateHandler};
use crate::error::ServiceError;

pub trait VolumeControl: Send + Sync {
    /// Current volume between 0.0 and 1.0
    fn get_volume(&self, success: Option<SuccessHandler<f64>>, failure: Option<FailureHandler>);

    /// Set the volume; values outside 0.0 - 1.0 are rejected without reaching the player
    fn set_volume(
        &self,
        volume: f64,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    );

    fn get_mute(&self, success: Option<SuccessHandler<bool>>, failure: Option<FailureHandler>);

    fn set_mute(
        &self,
        mute: bool,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    );

    fn volume_up(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn volume_down(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    /// Receive the volume whenever a status update carries it
    fn subscribe_volume(
        &self,
        on_update: UpdateHandler<f64>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription>;

    /// Receive the mute flag whenever a status update carries it
    fn subscribe_mute(
        &self,
        on_update: UpdateHandler<bool>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription>;
}

/// [`VolumeControl`] backed by a Fire TV player
///
/// Volume and mute subscriptions share the device's status listener with the
/// media control, so they go through its subscription manager.
pub struct FireTvVolumeControl {
    media_control: Arc<FireTvMediaControl>,
}

impl FireTvVolumeControl {
    pub fn new(media_control: Arc<FireTvMediaControl>) -> Self {
        Self { media_control }
    }
}

impl Capability for FireTvVolumeControl {
    fn mixin(&self) -> &Arc<CapabilityMixin> {
        self.media_control.mixin()
    }
}

impl VolumeControl for FireTvVolumeControl {
    fn get_volume(&self, success: Option<SuccessHandler<f64>>, failure: Option<FailureHandler>) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().get_volume(), success, failure);
    }

    fn set_volume(
        &self,
        volume: f64,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        if !(0.0..=1.0).contains(&volume) {
            return mixin.bridge().fail(
                failure,
                ServiceError::invalid_argument(format!("volume {volume} is outside 0.0 - 1.0")),
            );
        }

        mixin.continue_task(mixin.device().set_volume(volume), success, failure);
    }

    fn get_mute(&self, success: Option<SuccessHandler<bool>>, failure: Option<FailureHandler>) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().is_mute(), success, failure);
    }

    fn set_mute(
        &self,
        mute: bool,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = self.mixin();
        mixin.continue_task(mixin.device().set_mute(mute), success, failure);
    }

    fn volume_up(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin().fail_unsupported(failure, "volume_up");
    }

    fn volume_down(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin().fail_unsupported(failure, "volume_down");
    }

    fn subscribe_volume(
        &self,
        on_update: UpdateHandler<f64>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription> {
        let callback: StatusCallback = Arc::new(move |status: &PlaybackStatus| {
            if let Some(volume) = status.volume {
                on_update(volume);
            }
        });
        Some(
            self.media_control
                .subscribe_role(ListenerRole::Volume, callback, failure),
        )
    }

    fn subscribe_mute(
        &self,
        on_update: UpdateHandler<bool>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription> {
        let callback: StatusCallback = Arc::new(move |status: &PlaybackStatus| {
            if let Some(mute) = status.mute {
                on_update(mute);
            }
        });
        Some(
            self.media_control
                .subscribe_role(ListenerRole::Mute, callback, failure),
        )
    }
}
