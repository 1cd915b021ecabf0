//! Context-bound timing operators through the public API.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mainline::prelude::*;
use mainline::stream::{Completion, Empty, Just};
use mainline::{BroadcastSubject, Subscription};
use parking_lot::Mutex;

use super::test_utils::{context, on_context, recorder, wait_until, Event, Recorded};

type Fixture = (
    BroadcastSubject<i32, &'static str>,
    Recorded<i32, &'static str>,
    Subscription,
);

/// A subject, the pipeline `build` makes from it, and a recorder attached on
/// the context.
fn subject_with_subscriber<P, F>(build: F) -> Fixture
where
    F: FnOnce(BroadcastSubject<i32, &'static str>) -> P,
    P: Publisher<Output = i32, Failure = &'static str> + Send + 'static,
{
    context();
    let subject = on_context(BroadcastSubject::<i32, &'static str>::new);
    let pipeline = build(subject.clone());
    let (subscriber, recorded) = recorder();
    let subscription = on_context(move || pipeline.receive(subscriber));
    (subject, recorded, subscription)
}

#[test]
fn test_throttle_latest_emits_first_and_last_of_burst() {
    let (subject, recorded, _subscription) =
        subject_with_subscriber(|s| s.throttle(Duration::from_millis(50), true));
    on_context(move || (1..=5).for_each(|v| subject.send(v)));

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 2));
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(recorded.values(), vec![1, 5]);
    assert!(recorded.all_on_context());
}

#[test]
fn test_throttle_first_emits_first_two_of_burst() {
    let (subject, recorded, _subscription) =
        subject_with_subscriber(|s| s.throttle(Duration::from_millis(50), false));
    on_context(move || (1..=5).for_each(|v| subject.send(v)));

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 2));
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(recorded.values(), vec![1, 2]);
}

#[test]
fn test_debounce_emits_after_quiet_period() {
    let (subject, recorded, _subscription) =
        subject_with_subscriber(|s| s.debounce(Duration::from_millis(30)));
    let writer = subject.clone();
    on_context(move || (1..=3).for_each(|v| writer.send(v)));
    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 1));

    on_context(move || subject.send(4));
    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 2));
    assert_eq!(recorded.values(), vec![3, 4]);
}

#[test]
fn test_delay_shifts_values_and_completion() {
    context();
    let (subscriber, recorded) = recorder::<i32, Infallible>();
    let start = Instant::now();
    let _subscription = on_context(move || {
        Just::new(7)
            .delay(Duration::from_millis(40))
            .receive(subscriber)
    });

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 2));
    assert_eq!(
        recorded.events(),
        vec![Event::Value(7), Event::Completion(Completion::Finished)]
    );
    for at in recorded.times() {
        assert!(at.duration_since(start) >= Duration::from_millis(40));
    }
}

#[test]
fn test_timeout_fails_with_custom_error() {
    context();
    let (subscriber, recorded) = recorder::<i32, &'static str>();
    let _subscription = on_context(move || {
        Empty::<i32, &'static str>::never()
            .timeout_with(Duration::from_millis(20), || "timed out")
            .receive(subscriber)
    });

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 1));
    assert_eq!(
        recorded.completion(),
        Some(Completion::Failure("timed out"))
    );
}

#[test]
fn test_timeout_without_error_finishes() {
    context();
    let (subscriber, recorded) = recorder::<i32, &'static str>();
    let _subscription = on_context(move || {
        Empty::<i32, &'static str>::never()
            .timeout(Duration::from_millis(20))
            .receive(subscriber)
    });

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 1));
    assert_eq!(recorded.completion(), Some(Completion::Finished));
}

#[test]
fn test_sink_on_context_for_throttled_pipeline() {
    context();
    let subject = on_context(BroadcastSubject::<i32, Infallible>::new);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let _guard = subject
        .clone()
        .throttle(Duration::from_millis(30), true)
        .sink_value_on_context(move |value| record.lock().push(value));

    let writer = subject.clone();
    assert!(wait_until(Duration::from_secs(2), || {
        let writer = writer.clone();
        on_context(move || writer.subscriber_count()) == 1
    }));
    on_context(move || (1..=5).for_each(|v| writer.send(v)));
    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 2));
    assert_eq!(*seen.lock(), vec![1, 5]);
}
