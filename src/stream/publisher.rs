use std::convert::Infallible;
use std::time::Duration;

use super::combine::{Catch, Chain, CombineLatest, FlatMap, Merge, Zip};
use super::scheduler::Scheduler;
use super::subscriber::{Completion, Sink, Subscriber};
use super::subscription::{Subscription, SubscriptionGuard};
use super::timing::{Debounce, Delay, ReceiveOn, Throttle, Timeout};
use super::transform::{
    EventHooks, Filter, FilterMap, FirstWhere, HandleEvents, Map, MapFailure, RemoveDuplicates,
    ReplaceError, Scan, SetFailureType, Skip, SkipWhile, Take, TakeWhile, TryFilter, TryMap,
};
use super::values::Values;

/// A source of values followed by at most one completion.
///
/// Every call to [`receive`](Self::receive) is an independent attachment and
/// returns the handle that cancels it. Demand is unlimited.
pub trait Publisher {
    type Output: Send + 'static;
    type Failure: Send + 'static;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<Self::Output, Self::Failure>;
}

/// Attach to `upstream` behind a fresh subscription that owns the upstream
/// attachment. Operators that may end the stream early use this so they can
/// cancel upstream without touching the downstream's handle.
pub(crate) fn receive_linked<P, W>(upstream: &P, wrap: impl FnOnce(Subscription) -> W) -> Subscription
where
    P: Publisher + ?Sized,
    W: Subscriber<P::Output, P::Failure>,
{
    let subscription = Subscription::new();
    let attachment = upstream.receive(wrap(subscription.clone()));
    subscription.add(attachment);
    subscription
}

/// Operator methods available on every [`Publisher`].
pub trait PublisherExt: Publisher + Sized {
    fn map<T, F>(self, transform: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Map::new(self, transform)
    }

    fn try_map<T, F>(self, transform: F) -> TryMap<Self, F>
    where
        F: Fn(Self::Output) -> Result<T, Self::Failure> + Send + Sync + 'static,
        T: Send + 'static,
    {
        TryMap::new(self, transform)
    }

    fn filter_map<T, F>(self, transform: F) -> FilterMap<Self, F>
    where
        F: Fn(Self::Output) -> Option<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        FilterMap::new(self, transform)
    }

    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        Filter::new(self, predicate)
    }

    fn try_filter<F>(self, predicate: F) -> TryFilter<Self, F>
    where
        F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
    {
        TryFilter::new(self, predicate)
    }

    fn scan<A, F>(self, initial: A, accumulate: F) -> Scan<Self, A, F>
    where
        A: Clone + Send + 'static,
        F: Fn(A, Self::Output) -> A + Send + Sync + 'static,
    {
        Scan::new(self, initial, accumulate)
    }

    fn remove_duplicates(self) -> RemoveDuplicates<Self>
    where
        Self::Output: Clone + PartialEq,
    {
        RemoveDuplicates::new(self)
    }

    fn skip(self, count: usize) -> Skip<Self> {
        Skip::new(self, count)
    }

    fn skip_while<F>(self, predicate: F) -> SkipWhile<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        SkipWhile::new(self, predicate)
    }

    fn take(self, count: usize) -> Take<Self> {
        Take::new(self, count)
    }

    fn take_while<F>(self, predicate: F) -> TakeWhile<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        TakeWhile::new(self, predicate)
    }

    fn first_where<F>(self, predicate: F) -> FirstWhere<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        FirstWhere::new(self, predicate)
    }

    fn handle_events(
        self,
        hooks: EventHooks<Self::Output, Self::Failure>,
    ) -> HandleEvents<Self, Self::Output, Self::Failure> {
        HandleEvents::new(self, hooks)
    }

    fn set_failure_type<E>(self) -> SetFailureType<Self, E>
    where
        Self: Publisher<Failure = Infallible>,
        E: Send + 'static,
    {
        SetFailureType::new(self)
    }

    fn map_failure<E, F>(self, transform: F) -> MapFailure<Self, F>
    where
        F: Fn(Self::Failure) -> E + Send + Sync + 'static,
        E: Send + 'static,
    {
        MapFailure::new(self, transform)
    }

    fn replace_error(self, replacement: Self::Output) -> ReplaceError<Self, Self::Output>
    where
        Self::Output: Clone,
    {
        ReplaceError::new(self, replacement)
    }

    fn catch<P, F>(self, recover: F) -> Catch<Self, F>
    where
        F: Fn(Self::Failure) -> P + Send + Sync + 'static,
        P: Publisher<Output = Self::Output>,
    {
        Catch::new(self, recover)
    }

    fn flat_map<P, F>(self, transform: F) -> FlatMap<Self, F>
    where
        F: Fn(Self::Output) -> P + Send + Sync + 'static,
        P: Publisher<Failure = Self::Failure>,
    {
        FlatMap::new(self, transform)
    }

    /// All of `self`, then all of `suffix`.
    fn chain<B>(self, suffix: B) -> Chain<Self, B>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure> + Send + Sync + 'static,
    {
        Chain::new(self, suffix)
    }

    fn merge<B>(self, other: B) -> Merge<Self, B>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge::new(self, other)
    }

    fn zip<B>(self, other: B) -> Zip<Self, B>
    where
        B: Publisher<Failure = Self::Failure>,
    {
        Zip::new(self, other)
    }

    fn combine_latest<B>(self, other: B) -> CombineLatest<Self, B>
    where
        B: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
    {
        CombineLatest::new(self, other)
    }

    fn receive_on<Sch: Scheduler>(self, scheduler: Sch) -> ReceiveOn<Self, Sch> {
        ReceiveOn::new(self, scheduler)
    }

    fn delay_on<Sch: Scheduler>(self, interval: Duration, scheduler: Sch) -> Delay<Self, Sch> {
        Delay::new(self, interval, scheduler)
    }

    fn debounce_on<Sch: Scheduler>(self, due: Duration, scheduler: Sch) -> Debounce<Self, Sch> {
        Debounce::new(self, due, scheduler)
    }

    fn throttle_on<Sch: Scheduler>(
        self,
        interval: Duration,
        scheduler: Sch,
        latest: bool,
    ) -> Throttle<Self, Sch> {
        Throttle::new(self, interval, scheduler, latest)
    }

    /// Fails with `custom_error` (or finishes when `None`) if no value
    /// arrives within `interval` of subscription or of the previous value.
    fn timeout_on<Sch: Scheduler>(
        self,
        interval: Duration,
        scheduler: Sch,
        custom_error: Option<Box<dyn Fn() -> Self::Failure + Send + Sync>>,
    ) -> Timeout<Self, Sch, Self::Failure> {
        Timeout::new(self, interval, scheduler, custom_error)
    }

    /// Attach closures on whatever thread delivers.
    fn sink<FC, FV>(&self, receive_completion: FC, receive_value: FV) -> SubscriptionGuard
    where
        FC: FnMut(Completion<Self::Failure>) + Send + 'static,
        FV: FnMut(Self::Output) + Send + 'static,
    {
        SubscriptionGuard::new(self.receive(Sink::new(receive_completion, receive_value)))
    }

    /// Bridge into an async [`Stream`](futures::Stream) of results.
    fn values(&self) -> Values<Self::Output, Self::Failure> {
        Values::attach(self)
    }
}

impl<P: Publisher> PublisherExt for P {}
