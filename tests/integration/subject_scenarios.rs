//! End-to-end scenarios for the context-owned sources.

use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use mainline::prelude::*;
use mainline::stream::{Completion, Sequence};
use mainline::{BroadcastSubject, ContextFuture, ContextTimer, ReplaySubject};
use parking_lot::Mutex;

use super::test_utils::{context, on_context, recorder, wait_until, Event};

#[test]
fn test_replay_subject_observed_from_worker_attachment() {
    context();
    let subject = on_context(|| ReplaySubject::<i32, Infallible>::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let _guard = subject.clone().sink_value_on_context(move |value| {
        record.lock().push(value);
    });

    let writer = subject.clone();
    on_context(move || {
        writer.set_value(5);
        writer.set_value(7);
    });

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 3));
    assert_eq!(*seen.lock(), vec![0, 5, 7]);
}

#[test]
fn test_replay_subject_many_subscribers_same_order() {
    let (first, second) = on_context(|| {
        let subject = ReplaySubject::<&'static str, ()>::new("a");
        let (s1, r1) = recorder();
        let (s2, r2) = recorder();
        let _k1 = subject.receive(s1);
        subject.send("b");
        let _k2 = subject.receive(s2);
        subject.send("c");
        subject.send_completion(Completion::Finished);
        (r1.events(), r2.events())
    });
    assert_eq!(
        first,
        vec![
            Event::Value("a"),
            Event::Value("b"),
            Event::Value("c"),
            Event::Completion(Completion::Finished),
        ]
    );
    assert_eq!(
        second,
        vec![
            Event::Value("b"),
            Event::Value("c"),
            Event::Completion(Completion::Finished),
        ]
    );
}

#[test]
fn test_broadcast_subject_through_tagged_pipeline() {
    context();
    let subject = BroadcastSubject::<u32, Infallible>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let _guard = subject
        .clone()
        .filter(|v| v % 2 == 0)
        .map(|v| v * 10)
        .sink_value_on_context(move |value| record.lock().push(value));

    let writer = subject.clone();
    assert!(wait_until(Duration::from_secs(2), || {
        let writer = writer.clone();
        on_context(move || writer.subscriber_count()) == 1
    }));
    on_context(move || {
        for v in 1..=6 {
            writer.send(v);
        }
    });

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 3));
    assert_eq!(*seen.lock(), vec![20, 40, 60]);
}

#[test]
fn test_broadcast_send_off_context_panics() {
    context();
    let subject = BroadcastSubject::<u32, ()>::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| subject.send(1)));
    assert!(outcome.is_err());
}

#[test]
fn test_future_fulfilled_later_reaches_every_subscriber() {
    let (early, late, promise) = on_context(|| {
        let slot = Arc::new(Mutex::new(None));
        let keep = slot.clone();
        let future = ContextFuture::<i32, String>::new(move |promise| {
            *keep.lock() = Some(promise);
        });
        let (early, early_recorded) = recorder();
        let _k = future.receive(early);
        let promise = slot.lock().take();
        (early_recorded, future, promise)
    });
    let promise = promise.expect("promise captured");

    let future = late;
    on_context(move || promise.succeed(42));
    let (late_sub, late_recorded) = recorder();
    let _k = on_context(move || future.receive(late_sub));

    assert_eq!(
        early.events(),
        vec![Event::Value(42), Event::Completion(Completion::Finished)]
    );
    assert_eq!(
        late_recorded.events(),
        vec![Event::Value(42), Event::Completion(Completion::Finished)]
    );
    assert!(early.all_on_context());
}

#[test]
fn test_future_from_tokio_task() {
    context();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let handle = runtime.handle().clone();
    let future = on_context(move || {
        ContextFuture::<&'static str, ()>::spawn_on(&handle, async { Ok("done") })
    });

    let (subscriber, recorded) = recorder();
    let _direct = on_context(move || future.receive(subscriber));

    assert!(wait_until(Duration::from_secs(2), || recorded.len() == 2));
    assert_eq!(recorded.values(), vec!["done"]);
    assert!(recorded.all_on_context());
}

#[test]
fn test_timer_merged_with_sequence_stays_on_context() {
    context();
    let timer = ContextTimer::with_tolerance(Duration::from_millis(5), Duration::ZERO);
    let ticks = timer
        .clone()
        .autoconnect()
        .map(|_| 0u32);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let guard = Sequence::<u32, Infallible>::new([1, 2, 3])
        .merge(ticks)
        .take(5)
        .sink_value_on_context(move |value| record.lock().push(value));

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 5));
    let values = seen.lock().clone();
    assert_eq!(&values[..3], &[1, 2, 3]);
    assert_eq!(&values[3..], &[0, 0]);
    drop(guard);
    assert!(wait_until(Duration::from_secs(2), || !timer.is_connected()));
}
