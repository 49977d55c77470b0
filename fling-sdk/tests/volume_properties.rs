//! Property tests for locally validated volume arguments

use std::sync::{mpsc, Arc};

use fling_api::testing::{Completion, FakeMediaPlayer};
use fling_runtime::ImmediateContext;
use fling_sdk::{FireTvService, ServiceError, ServiceOptions};
use proptest::prelude::*;

fn inline_service() -> (Arc<FakeMediaPlayer>, FireTvService) {
    let player = FakeMediaPlayer::new("tv-1", "Office")
        .with_completion(Completion::Inline)
        .shared();
    let service = FireTvService::new(
        player.clone(),
        ServiceOptions {
            callback_context: Some(ImmediateContext::shared()),
            ..Default::default()
        },
    );
    (player, service)
}

fn out_of_range() -> impl Strategy<Value = f64> {
    prop_oneof![
        (1.0f64..1.0e9).prop_filter("above range", |v| *v > 1.0),
        -1.0e9f64..-f64::EPSILON,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_out_of_range_volume_never_reaches_player(volume in out_of_range()) {
        let (player, service) = inline_service();
        let (tx, rx) = mpsc::channel();

        service.volume_control().set_volume(
            volume,
            Some(Box::new(|()| panic!("success must not fire"))),
            Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())),
        );

        prop_assert!(matches!(rx.try_recv(), Ok(ServiceError::InvalidArgument(_))));
        prop_assert_eq!(player.call_count("set_volume"), 0);
    }

    #[test]
    fn prop_in_range_volume_is_applied(volume in 0.0f64..=1.0) {
        let (player, service) = inline_service();
        let (tx, rx) = mpsc::channel();

        service.volume_control().set_volume(
            volume,
            Some(Box::new(move |()| tx.send(()).unwrap())),
            None,
        );

        prop_assert!(rx.try_recv().is_ok());
        prop_assert_eq!(player.volume(), volume);
    }
}
