//! Playback control

use std::sync::Arc;
use std::time::Duration;

use fling_api::{MediaState, SeekMode};
use fling_event_manager::{
    ListenerRole, StatusCallback, Subscription, SubscriptionLifecycleManager,
};
use fling_state::{PlayState, PlaybackStatus};
use parking_lot::{Mutex, RwLock};

use super::mixin::{Capability, CapabilityMixin};
use crate::bridge::{FailureHandler, SuccessHandler, UpdateHandler};
use crate::error::ServiceError;

/// Transport controls and playback status of a device
pub trait MediaControl: Send + Sync {
    fn play(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn pause(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn stop(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn rewind(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn fast_forward(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn previous(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    fn next(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>);

    /// Seek to an absolute position from the start of the clip
    fn seek(
        &self,
        position: Duration,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    );

    fn get_duration(
        &self,
        success: Option<SuccessHandler<Duration>>,
        failure: Option<FailureHandler>,
    );

    fn get_position(
        &self,
        success: Option<SuccessHandler<Duration>>,
        failure: Option<FailureHandler>,
    );

    fn get_play_state(
        &self,
        success: Option<SuccessHandler<PlayState>>,
        failure: Option<FailureHandler>,
    );

    /// Full status including the current position
    fn get_status(
        &self,
        success: Option<SuccessHandler<PlaybackStatus>>,
        failure: Option<FailureHandler>,
    );

    /// Receive the play state on every status update
    ///
    /// Returns `None` if the device cannot deliver status updates; `failure`
    /// then receives [`ServiceError::UnsupportedOperation`].
    fn subscribe_play_state(
        &self,
        on_update: UpdateHandler<PlayState>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription>;

    fn subscribe_status(
        &self,
        on_update: UpdateHandler<PlaybackStatus>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription>;
}

/// [`MediaControl`] backed by a Fire TV player
pub struct FireTvMediaControl {
    mixin: Arc<CapabilityMixin>,
    subscriptions: SubscriptionLifecycleManager,
    position_update_interval: RwLock<Option<Duration>>,
}

impl FireTvMediaControl {
    pub fn new(
        mixin: Arc<CapabilityMixin>,
        subscriptions: SubscriptionLifecycleManager,
        position_update_interval: Option<Duration>,
    ) -> Self {
        Self {
            mixin,
            subscriptions,
            position_update_interval: RwLock::new(position_update_interval),
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionLifecycleManager {
        &self.subscriptions
    }

    /// Seek relative to the current position; negative offsets seek back
    pub fn seek_relative(
        &self,
        offset_ms: i64,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let task = self
            .mixin
            .device()
            .seek_to_position(offset_ms, SeekMode::Relative);
        self.mixin.continue_task(task, success, failure);
    }

    /// Change how often the player reports its position while playing
    ///
    /// The interval is also remembered: it is applied when the first status
    /// subscription registers the listener, and again when
    /// [`resume_subscriptions`](Self::resume_subscriptions) re-attaches it.
    /// `None` disables position updates.
    pub fn set_position_update_interval(
        &self,
        interval: Option<Duration>,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        let interval_ms = match interval.map(duration_to_ms).transpose() {
            Ok(ms) => ms.unwrap_or(0),
            Err(error) => return self.mixin.bridge().fail(failure, error),
        };

        *self.position_update_interval.write() = interval;
        let task = self.mixin.device().set_position_update_interval(interval_ms);
        self.mixin.continue_task(task, success, failure);
    }

    pub fn position_update_interval(&self) -> Option<Duration> {
        *self.position_update_interval.read()
    }

    /// Stop delivering status updates for this device until resumed
    pub fn pause_subscriptions(&self) -> bool {
        self.subscriptions.pause(self.mixin.device_id())
    }

    pub fn resume_subscriptions(&self) -> bool {
        let resumed = self.subscriptions.resume(self.mixin.device_id());
        if resumed {
            self.apply_position_update_interval();
        }
        resumed
    }

    /// Tear down every status subscription of this device
    pub fn unsubscribe_subscriptions(&self) -> bool {
        self.subscriptions.unsubscribe_all(self.mixin.device_id())
    }

    pub fn play_state_for_media_state(state: MediaState) -> PlayState {
        PlayState::from_media_state(state)
    }

    /// Subscribe `callback` under `role`, registering the device's listener if needed
    pub(crate) fn subscribe_role(
        &self,
        role: ListenerRole,
        callback: StatusCallback,
        failure: Option<FailureHandler>,
    ) -> Subscription {
        let subscribed = self
            .subscriptions
            .subscribe(self.mixin.device(), role, callback);

        if let Some(registration) = subscribed.registration {
            self.apply_position_update_interval();
            self.mixin.continue_task(registration, None, failure);
        }

        subscribed.subscription
    }

    fn apply_position_update_interval(&self) {
        let Some(interval) = self.position_update_interval() else {
            return;
        };
        let Ok(interval_ms) = duration_to_ms(interval) else {
            return;
        };

        let device_id = self.mixin.device_id().to_string();
        self.mixin
            .device()
            .set_position_update_interval(interval_ms)
            .continue_with(self.mixin.default_executor().clone(), move |result| {
                if let Err(error) = result {
                    tracing::warn!(
                        "Failed to set position update interval on {}: {}",
                        device_id,
                        error
                    );
                }
            });
    }
}

impl Capability for FireTvMediaControl {
    fn mixin(&self) -> &Arc<CapabilityMixin> {
        &self.mixin
    }
}

impl MediaControl for FireTvMediaControl {
    fn play(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin
            .continue_task(self.mixin.device().play(), success, failure);
    }

    fn pause(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin
            .continue_task(self.mixin.device().pause(), success, failure);
    }

    fn stop(&self, success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin
            .continue_task(self.mixin.device().stop(), success, failure);
    }

    fn rewind(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin.fail_unsupported(failure, "rewind");
    }

    fn fast_forward(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin.fail_unsupported(failure, "fast_forward");
    }

    fn previous(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin.fail_unsupported(failure, "previous");
    }

    fn next(&self, _success: Option<SuccessHandler<()>>, failure: Option<FailureHandler>) {
        self.mixin.fail_unsupported(failure, "next");
    }

    fn seek(
        &self,
        position: Duration,
        success: Option<SuccessHandler<()>>,
        failure: Option<FailureHandler>,
    ) {
        match duration_to_ms(position) {
            Ok(position_ms) => {
                let task = self
                    .mixin
                    .device()
                    .seek_to_position(position_ms, SeekMode::Absolute);
                self.mixin.continue_task(task, success, failure);
            }
            Err(error) => self.mixin.bridge().fail(failure, error),
        }
    }

    fn get_duration(
        &self,
        success: Option<SuccessHandler<Duration>>,
        failure: Option<FailureHandler>,
    ) {
        self.mixin.bridge().continue_task_mapped(
            Some(self.mixin.device().get_duration()),
            ms_to_duration,
            success,
            failure,
        );
    }

    fn get_position(
        &self,
        success: Option<SuccessHandler<Duration>>,
        failure: Option<FailureHandler>,
    ) {
        self.mixin.bridge().continue_task_mapped(
            Some(self.mixin.device().get_position()),
            ms_to_duration,
            success,
            failure,
        );
    }

    fn get_play_state(
        &self,
        success: Option<SuccessHandler<PlayState>>,
        failure: Option<FailureHandler>,
    ) {
        self.mixin.bridge().continue_task_mapped(
            Some(self.mixin.device().get_status()),
            |status| PlaybackStatus::from_vendor(&status, 0).play_state(),
            success,
            failure,
        );
    }

    fn get_status(
        &self,
        success: Option<SuccessHandler<PlaybackStatus>>,
        failure: Option<FailureHandler>,
    ) {
        let mixin = Arc::clone(&self.mixin);
        let (failure, position_failure) = split_failure(failure);

        // The vendor status carries no position; fetch it once the status arrived
        self.mixin.bridge().continue_task_with_completer(
            Some(self.mixin.device().get_status()),
            move |status| {
                mixin.bridge().continue_task_mapped(
                    Some(mixin.device().get_position()),
                    move |position_ms| PlaybackStatus::from_vendor(&status, position_ms),
                    success,
                    position_failure,
                );
            },
            failure,
        );
    }

    fn subscribe_play_state(
        &self,
        on_update: UpdateHandler<PlayState>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription> {
        let callback: StatusCallback =
            Arc::new(move |status: &PlaybackStatus| on_update(status.play_state()));
        Some(self.subscribe_role(ListenerRole::PlayState, callback, failure))
    }

    fn subscribe_status(
        &self,
        on_update: UpdateHandler<PlaybackStatus>,
        failure: Option<FailureHandler>,
    ) -> Option<Subscription> {
        let callback: StatusCallback =
            Arc::new(move |status: &PlaybackStatus| on_update(status.clone()));
        Some(self.subscribe_role(ListenerRole::Status, callback, failure))
    }
}

fn ms_to_duration(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

fn duration_to_ms(duration: Duration) -> Result<i64, ServiceError> {
    i64::try_from(duration.as_millis()).map_err(|_| {
        ServiceError::invalid_argument(format!("duration out of range: {:?}", duration))
    })
}

/// Share one failure handler between two stages of a chained call
///
/// Only one stage can fail, so the handler still fires at most once.
fn split_failure(failure: Option<FailureHandler>) -> (Option<FailureHandler>, Option<FailureHandler>) {
    let Some(failure) = failure else {
        return (None, None);
    };

    let slot = Arc::new(Mutex::new(Some(failure)));
    let second = Arc::clone(&slot);
    (
        Some(Box::new(move |error| fire_once(&slot, error))),
        Some(Box::new(move |error| fire_once(&second, error))),
    )
}

fn fire_once(slot: &Mutex<Option<FailureHandler>>, error: ServiceError) {
    let failure = slot.lock().take();
    if let Some(failure) = failure {
        failure(error);
    }
}
