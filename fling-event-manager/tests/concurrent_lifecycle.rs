//! Racing pause/resume/unsubscribe_all on one device from several threads

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use fling_api::testing::{Completion, FakeMediaPlayer};
use fling_api::{DeviceHandle, MediaCondition, MediaPlayerStatus, MediaState};
use fling_event_manager::{ListenerRole, SubscriptionLifecycleManager, SubscriptionState};
use fling_runtime::ImmediateContext;
use fling_state::PlaybackStatus;

const ROUNDS: usize = 20;
const TOGGLERS: usize = 4;
const EMITTERS: usize = 2;

#[test]
fn test_racing_transitions_keep_one_listener_and_stop_at_removed() {
    for round in 0..ROUNDS {
        let player = FakeMediaPlayer::new("dev-1", "Den")
            .with_completion(Completion::VendorThread)
            .shared();
        let device: DeviceHandle = player.clone();
        let manager = SubscriptionLifecycleManager::new(ImmediateContext::shared());

        let torn_down = Arc::new(AtomicBool::new(false));
        let late = Arc::new(AtomicUsize::new(0));
        let callback = {
            let torn_down = Arc::clone(&torn_down);
            let late = Arc::clone(&late);
            Arc::new(move |_: &PlaybackStatus| {
                if torn_down.load(Ordering::SeqCst) {
                    late.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        manager.subscribe(&device, ListenerRole::Status, callback);
        manager.subscribe(&device, ListenerRole::Volume, Arc::new(|_: &PlaybackStatus| {}));

        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        for worker in 0..TOGGLERS {
            let manager = manager.clone();
            let player = Arc::clone(&player);
            handles.push(thread::spawn(move || {
                let mut seen_removed = false;
                for step in 0..100 {
                    if (worker + step) % 2 == 0 {
                        manager.pause("dev-1");
                    } else {
                        manager.resume("dev-1");
                    }

                    assert!(player.listener_count() <= 1);
                    let state = manager.state("dev-1");
                    if seen_removed {
                        assert_eq!(state, SubscriptionState::Removed);
                    }
                    seen_removed |= state == SubscriptionState::Removed;
                }
            }));
        }

        for _ in 0..EMITTERS {
            let player = Arc::clone(&player);
            let stop = Arc::clone(&stop);
            handles.push(thread::spawn(move || {
                let status = MediaPlayerStatus::new(MediaState::Playing, MediaCondition::Good);
                while !stop.load(Ordering::SeqCst) {
                    player.emit_status(&status, 0);
                    thread::yield_now();
                }
            }));
        }

        // Let the togglers get going before tearing down, later each round
        for _ in 0..round * 10 {
            thread::yield_now();
        }
        assert!(manager.unsubscribe_all("dev-1"));
        torn_down.store(true, Ordering::SeqCst);

        stop.store(true, Ordering::SeqCst);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.state("dev-1"), SubscriptionState::Removed);
        assert!(!manager.resume("dev-1"));
        assert_eq!(player.listener_count(), 0);
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert_eq!(manager.subscription_count(), 0);
    }
}
