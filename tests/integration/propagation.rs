//! Which pipelines carry the context tag. These are compile-time checks; a
//! regression fails the build rather than a test.

use std::convert::Infallible;
use std::time::Duration;

use mainline::prelude::*;
use mainline::stream::{
    combine_latest4, merge3, merge4, zip4, Empty, Fail, Just, MergeMany, Sequence,
};
use mainline::{BroadcastSubject, ContextFuture, ContextScheduler, ContextTimer, ReplaySubject};

use super::test_utils::on_context;

fn assert_tagged<P: ContextPublisher>(_: &P) {}

#[test]
fn test_sources_are_tagged() {
    assert_tagged(&Just::new(1));
    assert_tagged(&Empty::<i32, ()>::new());
    assert_tagged(&Fail::<i32, ()>::new(()));
    assert_tagged(&Sequence::<i32, ()>::new([1, 2]));
    assert_tagged(&BroadcastSubject::<i32, ()>::new());
    assert_tagged(&ReplaySubject::<i32, ()>::new(0));
    assert_tagged(&ContextTimer::new(Duration::from_millis(10)));
    assert_tagged(&ContextTimer::new(Duration::from_millis(10)).autoconnect());

    let future = on_context(|| ContextFuture::<i32, ()>::new(|promise| promise.succeed(1)));
    assert_tagged(&future);
}

#[test]
fn test_combinators_over_tagged_inputs_are_tagged() {
    let a = Sequence::<i32, Infallible>::new([1, 2]);
    let b = BroadcastSubject::<i32, Infallible>::new();
    let c = ReplaySubject::<i32, Infallible>::new(0);

    assert_tagged(&a.clone().chain(b.clone()));
    assert_tagged(&merge3(a.clone(), b.clone(), c.clone()));
    assert_tagged(&zip4(a.clone(), b.clone(), c.clone(), Just::new(9)));
    assert_tagged(&combine_latest4(a.clone(), b.clone(), c.clone(), Just::new(9)));
    assert_tagged(&MergeMany::new(vec![a.clone(), a.clone()]));
    assert_tagged(&merge4(a.clone(), b.clone(), c.clone(), Just::new(4)).merge(merge4(
        a.clone(),
        b.clone(),
        c.clone(),
        Just::new(8),
    )));
    assert_tagged(
        &Sequence::<i32, &'static str>::new([1, -1])
            .try_map(|n| if n > 0 { Ok(n) } else { Err("negative") })
            .catch(|_| Just::new(0).set_failure_type::<()>())
            .replace_error(0),
    );
    assert_tagged(&a.clone().flat_map(|n| Sequence::<i32, Infallible>::new([n, n])));
    assert_tagged(&a.skip(1).first_where(|n| *n > 1).map_failure(|e| e));
}

#[test]
fn test_timing_on_context_scheduler_is_tagged() {
    let subject = BroadcastSubject::<i32, ()>::new();
    assert_tagged(&subject.clone().throttle(Duration::from_millis(5), false));
    assert_tagged(&subject.clone().debounce(Duration::from_millis(5)));
    assert_tagged(&subject.clone().delay(Duration::from_millis(5)));
    assert_tagged(&subject.clone().timeout(Duration::from_millis(5)));
    assert_tagged(&subject.clone().timeout_with(Duration::from_millis(5), || ()));
    assert_tagged(
        &subject
            .clone()
            .debounce_on(Duration::from_millis(5), ContextScheduler::shared()),
    );
}

#[test]
fn test_on_context_tags_any_upstream() {
    struct Untagged;

    impl Publisher for Untagged {
        type Output = u8;
        type Failure = ();

        fn receive<S>(&self, mut subscriber: S) -> mainline::Subscription
        where
            S: mainline::stream::Subscriber<u8, ()>,
        {
            subscriber.receive_completion(mainline::Completion::Finished);
            mainline::Subscription::new()
        }
    }

    assert_tagged(&Untagged.on_context());
    assert_tagged(&Untagged.on_context().map(u32::from));
}
