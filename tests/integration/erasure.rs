//! Type erasure and the assumed-tag escape hatch.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use mainline::prelude::*;
use mainline::stream::{Completion, Just, MergeMany, Sequence, Subscriber, Subscription};
use mainline::{AnyContextPublisher, ContextScheduler, ReplaySubject};
use parking_lot::Mutex;

use super::test_utils::{context, on_context, wait_until};

/// Untagged publisher that nevertheless posts its single value to the
/// context.
struct Posted(i32);

impl Publisher for Posted {
    type Output = i32;
    type Failure = Infallible;

    fn receive<S>(&self, mut subscriber: S) -> Subscription
    where
        S: Subscriber<i32, Infallible>,
    {
        let value = self.0;
        ContextScheduler::shared().schedule(move || {
            subscriber.receive(value);
            subscriber.receive_completion(Completion::Finished);
        });
        Subscription::new()
    }
}

#[test]
fn test_heterogeneous_pipelines_share_one_type() {
    context();
    let subject = on_context(|| ReplaySubject::<i32, Infallible>::new(10));
    let sources: Vec<AnyContextPublisher<i32, Infallible>> = vec![
        Just::new(1).erase(),
        Sequence::<i32, Infallible>::new([2, 3]).map(|n| n * 100).erase(),
        subject.clone().take(1).erase(),
        Posted(7).assume_on_context(),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let _guard = MergeMany::new(sources).sink_on_context(
        |completion| assert_eq!(completion, Completion::Finished),
        move |value| record.lock().push(value),
    );

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 5));
    let mut values = seen.lock().clone();
    values.sort_unstable();
    assert_eq!(values, vec![1, 7, 10, 200, 300]);
}

#[test]
fn test_erasing_an_erased_publisher_reuses_it() {
    let erased = Just::new(3).erase();
    let again = erased.clone().erase();
    let assumed = erased.clone().assume_on_context();
    assert!(erased.ptr_eq(&again));
    assert!(erased.ptr_eq(&assumed));
    assert!(!erased.ptr_eq(&Just::new(3).erase()));
}

#[test]
fn test_assumed_publisher_checked_on_each_delivery() {
    context();
    let seen = Arc::new(Mutex::new(None));
    let record = seen.clone();
    let _guard = Posted(42)
        .assume_on_context()
        .sink_value_on_context(move |value| *record.lock() = Some(value));

    assert!(wait_until(Duration::from_secs(2), || seen.lock().is_some()));
    assert_eq!(*seen.lock(), Some(42));
}
