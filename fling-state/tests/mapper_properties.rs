use fling_api::{MediaCondition, MediaPlayerStatus, MediaState};
use fling_state::{PlayState, PlaybackStatus};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_out_of_range_codes_map_to_error(code in 8u32..) {
        prop_assert_eq!(PlayState::from_state_code(code), PlayState::Error);
    }

    #[test]
    fn prop_known_codes_agree_with_media_state(code in 0u32..8) {
        let state = MediaState::from_code(code).unwrap();
        prop_assert_eq!(PlayState::from_state_code(code), PlayState::from_media_state(state));
    }

    #[test]
    fn prop_status_is_always_in_range(
        state_code in any::<u32>(),
        condition_code in any::<u32>(),
        volume in proptest::num::f64::ANY,
        position in any::<i64>(),
    ) {
        let raw = MediaPlayerStatus::from_codes(state_code, condition_code).with_volume(volume);
        let status = PlaybackStatus::from_vendor(&raw, position);

        if let Some(v) = status.volume {
            prop_assert!((0.0..=1.0).contains(&v));
        }
        if MediaState::from_code(state_code).is_none() {
            prop_assert_eq!(status.play_state(), PlayState::Error);
        }
        if MediaCondition::from_code(condition_code).is_none() {
            prop_assert_eq!(status.condition, MediaCondition::ErrorUnknown);
        }
    }
}

#[test]
fn test_every_state_is_mapped_as_documented() {
    let expected = [
        PlayState::Idle,
        PlayState::Buffering,
        PlayState::Idle,
        PlayState::Playing,
        PlayState::Paused,
        PlayState::Buffering,
        PlayState::Finished,
        PlayState::Error,
    ];

    for (state, play_state) in MediaState::ALL.iter().zip(expected) {
        assert_eq!(PlayState::from_media_state(*state), play_state, "{state:?}");
    }
}
