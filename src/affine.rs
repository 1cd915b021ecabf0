//! The context-affinity tag.
//!
//! [`ContextPublisher`] is a marker: a type implementing it promises that
//! every value and completion it delivers arrives on the designated context.
//! Operators carry the tag when their inputs do (see the propagation table),
//! so the compiler rejects context-only consumers attached to pipelines that
//! could deliver elsewhere.

mod propagation;

use std::convert::Infallible;
use std::time::Duration;

use crate::erased::AnyContextPublisher;
use crate::scheduler::ContextScheduler;
use crate::stream::{
    Completion, Debounce, Delay, Publisher, ReceiveOn, Scheduler, Sink, Subscription,
    SubscriptionGuard, Throttle, Timeout,
};

/// A publisher that delivers on the designated context.
pub trait ContextPublisher: Publisher {}

/// Ways into the tagged world, available on every publisher.
pub trait PublisherAffinityExt: Publisher + Sized {
    /// Hop every delivery onto the context.
    fn on_context(self) -> ReceiveOn<Self, ContextScheduler> {
        ReceiveOn::new(self, ContextScheduler::shared())
    }

    /// Tag a publisher the caller knows delivers on the context. Each
    /// delivery is checked; an off-context one is a fatal contract violation.
    fn assume_on_context(self) -> AnyContextPublisher<Self::Output, Self::Failure>
    where
        Self: Send + Sync + 'static,
    {
        AnyContextPublisher::assume(self)
    }
}

impl<P: Publisher> PublisherAffinityExt for P {}

/// Consumers and context-bound timing operators for tagged publishers.
pub trait ContextPublisherExt: ContextPublisher + Sized {
    fn erase(self) -> AnyContextPublisher<Self::Output, Self::Failure>
    where
        Self: Send + Sync + 'static,
    {
        AnyContextPublisher::new(self)
    }

    /// Attach closures that run on the context.
    ///
    /// The attachment itself is made on the context (queued when called from
    /// elsewhere), so immediate sources also deliver there.
    fn sink_on_context<FC, FV>(self, mut receive_completion: FC, mut receive_value: FV) -> SubscriptionGuard
    where
        Self: Send + 'static,
        FC: FnMut(Completion<Self::Failure>) + Send + 'static,
        FV: FnMut(Self::Output) + Send + 'static,
    {
        let scheduler = ContextScheduler::shared();
        let sink = Sink::new(
            move |completion| {
                scheduler.assert_on_context("sink_on_context completion");
                receive_completion(completion)
            },
            move |value| {
                scheduler.assert_on_context("sink_on_context value");
                receive_value(value)
            },
        );

        let subscription = Subscription::new();
        let link = subscription.clone();
        scheduler.schedule(move || {
            if link.is_cancelled() {
                return;
            }
            let attachment = self.receive(sink);
            link.add(attachment);
        });
        SubscriptionGuard::new(subscription)
    }

    fn sink_value_on_context<FV>(self, receive_value: FV) -> SubscriptionGuard
    where
        Self: Publisher<Failure = Infallible> + Send + 'static,
        FV: FnMut(Self::Output) + Send + 'static,
    {
        self.sink_on_context(|_| {}, receive_value)
    }

    fn throttle(self, interval: Duration, latest: bool) -> Throttle<Self, ContextScheduler> {
        Throttle::new(self, interval, ContextScheduler::shared(), latest)
    }

    fn debounce(self, due: Duration) -> Debounce<Self, ContextScheduler> {
        Debounce::new(self, due, ContextScheduler::shared())
    }

    fn delay(self, interval: Duration) -> Delay<Self, ContextScheduler> {
        Delay::new(self, interval, ContextScheduler::shared())
    }

    /// Finish if no value arrives within `interval`.
    fn timeout(self, interval: Duration) -> Timeout<Self, ContextScheduler, Self::Failure> {
        Timeout::new(self, interval, ContextScheduler::shared(), None)
    }

    /// Fail with `custom_error()` if no value arrives within `interval`.
    fn timeout_with<F>(
        self,
        interval: Duration,
        custom_error: F,
    ) -> Timeout<Self, ContextScheduler, Self::Failure>
    where
        F: Fn() -> Self::Failure + Send + Sync + 'static,
    {
        Timeout::new(
            self,
            interval,
            ContextScheduler::shared(),
            Some(Box::new(custom_error)),
        )
    }
}

impl<P: ContextPublisher> ContextPublisherExt for P {}
