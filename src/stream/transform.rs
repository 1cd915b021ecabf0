//! Single-upstream operators.

use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use super::publisher::{receive_linked, Publisher};
use super::subscriber::{Completion, Gate, Subscriber};
use super::subscription::Subscription;

macro_rules! clone_operator {
    ($name:ident<$($param:ident),*> { $($field:ident),* }) => {
        impl<$($param),*> Clone for $name<$($param),*>
        where
            U: Clone,
        {
            fn clone(&self) -> Self {
                Self { $($field: self.$field.clone()),* }
            }
        }
    };
}

/// Transforms every value.
pub struct Map<U, F> {
    upstream: U,
    transform: Arc<F>,
}

impl<U, F> Map<U, F> {
    pub(crate) fn new(upstream: U, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

clone_operator!(Map<U, F> { upstream, transform });

impl<U, F, T> Publisher for Map<U, F>
where
    U: Publisher,
    F: Fn(U::Output) -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, U::Failure>,
    {
        self.upstream.receive(MapSubscriber {
            downstream: subscriber,
            transform: Arc::clone(&self.transform),
        })
    }
}

struct MapSubscriber<S, F> {
    downstream: S,
    transform: Arc<F>,
}

impl<S, F, A, T, E> Subscriber<A, E> for MapSubscriber<S, F>
where
    S: Subscriber<T, E>,
    F: Fn(A) -> T + Send + Sync + 'static,
{
    fn receive(&mut self, value: A) {
        self.downstream.receive((self.transform)(value))
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Fallible transform; an `Err` fails the stream and detaches upstream.
pub struct TryMap<U, F> {
    upstream: U,
    transform: Arc<F>,
}

impl<U, F> TryMap<U, F> {
    pub(crate) fn new(upstream: U, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

clone_operator!(TryMap<U, F> { upstream, transform });

impl<U, F, T> Publisher for TryMap<U, F>
where
    U: Publisher,
    F: Fn(U::Output) -> Result<T, U::Failure> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, U::Failure>,
    {
        receive_linked(&self.upstream, |subscription| TryMapSubscriber {
            gate: Gate::new(subscriber, subscription),
            transform: Arc::clone(&self.transform),
        })
    }
}

struct TryMapSubscriber<S, F, T, E> {
    gate: Gate<S, T, E>,
    transform: Arc<F>,
}

impl<S, F, A, T, E> Subscriber<A, E> for TryMapSubscriber<S, F, T, E>
where
    S: Subscriber<T, E>,
    F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: A) {
        if !self.gate.is_open() {
            return;
        }
        match (self.transform)(value) {
            Ok(value) => self.gate.send(value),
            Err(error) => self.gate.finish(Completion::Failure(error)),
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.gate.complete(completion)
    }
}

/// Transform and drop `None`s.
pub struct FilterMap<U, F> {
    upstream: U,
    transform: Arc<F>,
}

impl<U, F> FilterMap<U, F> {
    pub(crate) fn new(upstream: U, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

clone_operator!(FilterMap<U, F> { upstream, transform });

impl<U, F, T> Publisher for FilterMap<U, F>
where
    U: Publisher,
    F: Fn(U::Output) -> Option<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, U::Failure>,
    {
        self.upstream.receive(FilterMapSubscriber {
            downstream: subscriber,
            transform: Arc::clone(&self.transform),
        })
    }
}

struct FilterMapSubscriber<S, F> {
    downstream: S,
    transform: Arc<F>,
}

impl<S, F, A, T, E> Subscriber<A, E> for FilterMapSubscriber<S, F>
where
    S: Subscriber<T, E>,
    F: Fn(A) -> Option<T> + Send + Sync + 'static,
{
    fn receive(&mut self, value: A) {
        if let Some(value) = (self.transform)(value) {
            self.downstream.receive(value)
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Passes values the predicate accepts.
pub struct Filter<U, F> {
    upstream: U,
    predicate: Arc<F>,
}

impl<U, F> Filter<U, F> {
    pub(crate) fn new(upstream: U, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

clone_operator!(Filter<U, F> { upstream, predicate });

impl<U, F> Publisher for Filter<U, F>
where
    U: Publisher,
    F: Fn(&U::Output) -> bool + Send + Sync + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        self.upstream.receive(FilterSubscriber {
            downstream: subscriber,
            predicate: Arc::clone(&self.predicate),
        })
    }
}

struct FilterSubscriber<S, F> {
    downstream: S,
    predicate: Arc<F>,
}

impl<S, F, T, E> Subscriber<T, E> for FilterSubscriber<S, F>
where
    S: Subscriber<T, E>,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn receive(&mut self, value: T) {
        if (self.predicate)(&value) {
            self.downstream.receive(value)
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Fallible filter; an `Err` fails the stream and detaches upstream.
pub struct TryFilter<U, F> {
    upstream: U,
    predicate: Arc<F>,
}

impl<U, F> TryFilter<U, F> {
    pub(crate) fn new(upstream: U, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

clone_operator!(TryFilter<U, F> { upstream, predicate });

impl<U, F> Publisher for TryFilter<U, F>
where
    U: Publisher,
    F: Fn(&U::Output) -> Result<bool, U::Failure> + Send + Sync + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        receive_linked(&self.upstream, |subscription| TryFilterSubscriber {
            gate: Gate::new(subscriber, subscription),
            predicate: Arc::clone(&self.predicate),
        })
    }
}

struct TryFilterSubscriber<S, F, T, E> {
    gate: Gate<S, T, E>,
    predicate: Arc<F>,
}

impl<S, F, T, E> Subscriber<T, E> for TryFilterSubscriber<S, F, T, E>
where
    S: Subscriber<T, E>,
    F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        if !self.gate.is_open() {
            return;
        }
        match (self.predicate)(&value) {
            Ok(true) => self.gate.send(value),
            Ok(false) => {}
            Err(error) => self.gate.finish(Completion::Failure(error)),
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.gate.complete(completion)
    }
}

/// Running accumulation; emits every intermediate result.
pub struct Scan<U, A, F> {
    upstream: U,
    initial: A,
    accumulate: Arc<F>,
}

impl<U, A, F> Scan<U, A, F> {
    pub(crate) fn new(upstream: U, initial: A, accumulate: F) -> Self {
        Self {
            upstream,
            initial,
            accumulate: Arc::new(accumulate),
        }
    }
}

impl<U: Clone, A: Clone, F> Clone for Scan<U, A, F> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            initial: self.initial.clone(),
            accumulate: self.accumulate.clone(),
        }
    }
}

impl<U, A, F> Publisher for Scan<U, A, F>
where
    U: Publisher,
    A: Clone + Send + 'static,
    F: Fn(A, U::Output) -> A + Send + Sync + 'static,
{
    type Output = A;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<A, U::Failure>,
    {
        self.upstream.receive(ScanSubscriber {
            downstream: subscriber,
            accumulator: self.initial.clone(),
            accumulate: Arc::clone(&self.accumulate),
        })
    }
}

struct ScanSubscriber<S, A, F> {
    downstream: S,
    accumulator: A,
    accumulate: Arc<F>,
}

impl<S, A, F, T, E> Subscriber<T, E> for ScanSubscriber<S, A, F>
where
    S: Subscriber<A, E>,
    A: Clone + Send + 'static,
    F: Fn(A, T) -> A + Send + Sync + 'static,
{
    fn receive(&mut self, value: T) {
        let next = (self.accumulate)(self.accumulator.clone(), value);
        self.accumulator = next.clone();
        self.downstream.receive(next)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Suppresses values equal to the previously delivered one.
#[derive(Clone)]
pub struct RemoveDuplicates<U> {
    upstream: U,
}

impl<U> RemoveDuplicates<U> {
    pub(crate) fn new(upstream: U) -> Self {
        Self { upstream }
    }
}

impl<U> Publisher for RemoveDuplicates<U>
where
    U: Publisher,
    U::Output: Clone + PartialEq,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        self.upstream.receive(RemoveDuplicatesSubscriber {
            downstream: subscriber,
            last: None,
        })
    }
}

struct RemoveDuplicatesSubscriber<S, T> {
    downstream: S,
    last: Option<T>,
}

impl<S, T, E> Subscriber<T, E> for RemoveDuplicatesSubscriber<S, T>
where
    S: Subscriber<T, E>,
    T: Clone + PartialEq + Send + 'static,
{
    fn receive(&mut self, value: T) {
        if self.last.as_ref() == Some(&value) {
            return;
        }
        self.last = Some(value.clone());
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Drops the first `count` values.
#[derive(Clone)]
pub struct Skip<U> {
    upstream: U,
    count: usize,
}

impl<U> Skip<U> {
    pub(crate) fn new(upstream: U, count: usize) -> Self {
        Self { upstream, count }
    }
}

impl<U: Publisher> Publisher for Skip<U> {
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        self.upstream.receive(SkipSubscriber {
            downstream: subscriber,
            remaining: self.count,
        })
    }
}

struct SkipSubscriber<S> {
    downstream: S,
    remaining: usize,
}

impl<S, T, E> Subscriber<T, E> for SkipSubscriber<S>
where
    S: Subscriber<T, E>,
{
    fn receive(&mut self, value: T) {
        if self.remaining > 0 {
            self.remaining -= 1;
            return;
        }
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Drops values while the predicate holds, then passes everything.
pub struct SkipWhile<U, F> {
    upstream: U,
    predicate: Arc<F>,
}

impl<U, F> SkipWhile<U, F> {
    pub(crate) fn new(upstream: U, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

clone_operator!(SkipWhile<U, F> { upstream, predicate });

impl<U, F> Publisher for SkipWhile<U, F>
where
    U: Publisher,
    F: Fn(&U::Output) -> bool + Send + Sync + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        self.upstream.receive(SkipWhileSubscriber {
            downstream: subscriber,
            predicate: Arc::clone(&self.predicate),
            skipping: true,
        })
    }
}

struct SkipWhileSubscriber<S, F> {
    downstream: S,
    predicate: Arc<F>,
    skipping: bool,
}

impl<S, F, T, E> Subscriber<T, E> for SkipWhileSubscriber<S, F>
where
    S: Subscriber<T, E>,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn receive(&mut self, value: T) {
        if self.skipping && (self.predicate)(&value) {
            return;
        }
        self.skipping = false;
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.downstream.receive_completion(completion)
    }
}

/// Delivers at most `count` values, then finishes and detaches upstream.
#[derive(Clone)]
pub struct Take<U> {
    upstream: U,
    count: usize,
}

impl<U> Take<U> {
    pub(crate) fn new(upstream: U, count: usize) -> Self {
        Self { upstream, count }
    }
}

impl<U: Publisher> Publisher for Take<U> {
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        if self.count == 0 {
            let mut gate = Gate::new(subscriber, Subscription::new());
            gate.complete(Completion::Finished);
            return gate.subscription().clone();
        }
        receive_linked(&self.upstream, |subscription| TakeSubscriber {
            gate: Gate::new(subscriber, subscription),
            remaining: self.count,
        })
    }
}

struct TakeSubscriber<S, T, E> {
    gate: Gate<S, T, E>,
    remaining: usize,
}

impl<S, T, E> Subscriber<T, E> for TakeSubscriber<S, T, E>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.gate.send(value);
        if self.remaining == 0 {
            self.gate.finish(Completion::Finished);
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.gate.complete(completion)
    }
}

/// Delivers values while the predicate holds; finishes on the first miss.
pub struct TakeWhile<U, F> {
    upstream: U,
    predicate: Arc<F>,
}

impl<U, F> TakeWhile<U, F> {
    pub(crate) fn new(upstream: U, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

clone_operator!(TakeWhile<U, F> { upstream, predicate });

impl<U, F> Publisher for TakeWhile<U, F>
where
    U: Publisher,
    F: Fn(&U::Output) -> bool + Send + Sync + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        receive_linked(&self.upstream, |subscription| TakeWhileSubscriber {
            gate: Gate::new(subscriber, subscription),
            predicate: Arc::clone(&self.predicate),
        })
    }
}

struct TakeWhileSubscriber<S, F, T, E> {
    gate: Gate<S, T, E>,
    predicate: Arc<F>,
}

impl<S, F, T, E> Subscriber<T, E> for TakeWhileSubscriber<S, F, T, E>
where
    S: Subscriber<T, E>,
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        if !self.gate.is_open() {
            return;
        }
        if (self.predicate)(&value) {
            self.gate.send(value);
        } else {
            self.gate.finish(Completion::Finished);
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.gate.complete(completion)
    }
}

/// Delivers the first matching value, then finishes.
pub struct FirstWhere<U, F> {
    upstream: U,
    predicate: Arc<F>,
}

impl<U, F> FirstWhere<U, F> {
    pub(crate) fn new(upstream: U, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

clone_operator!(FirstWhere<U, F> { upstream, predicate });

impl<U, F> Publisher for FirstWhere<U, F>
where
    U: Publisher,
    F: Fn(&U::Output) -> bool + Send + Sync + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        receive_linked(&self.upstream, |subscription| FirstWhereSubscriber {
            gate: Gate::new(subscriber, subscription),
            predicate: Arc::clone(&self.predicate),
        })
    }
}

struct FirstWhereSubscriber<S, F, T, E> {
    gate: Gate<S, T, E>,
    predicate: Arc<F>,
}

impl<S, F, T, E> Subscriber<T, E> for FirstWhereSubscriber<S, F, T, E>
where
    S: Subscriber<T, E>,
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        if self.gate.is_open() && (self.predicate)(&value) {
            self.gate.send(value);
            self.gate.finish(Completion::Finished);
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.gate.complete(completion)
    }
}

type Hook = Arc<dyn Fn() + Send + Sync>;
type ValueHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CompletionHook<E> = Arc<dyn Fn(&Completion<E>) + Send + Sync>;

/// Side-effect callbacks for [`HandleEvents`].
pub struct EventHooks<T, E> {
    on_subscribe: Option<Hook>,
    on_value: Option<ValueHook<T>>,
    on_completion: Option<CompletionHook<E>>,
    on_cancel: Option<Hook>,
}

impl<T, E> EventHooks<T, E> {
    pub fn new() -> Self {
        Self {
            on_subscribe: None,
            on_value: None,
            on_completion: None,
            on_cancel: None,
        }
    }

    pub fn on_subscribe(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_subscribe = Some(Arc::new(hook));
        self
    }

    pub fn on_value(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_value = Some(Arc::new(hook));
        self
    }

    pub fn on_completion(mut self, hook: impl Fn(&Completion<E>) + Send + Sync + 'static) -> Self {
        self.on_completion = Some(Arc::new(hook));
        self
    }

    pub fn on_cancel(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(hook));
        self
    }
}

impl<T, E> Default for EventHooks<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for EventHooks<T, E> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: self.on_subscribe.clone(),
            on_value: self.on_value.clone(),
            on_completion: self.on_completion.clone(),
            on_cancel: self.on_cancel.clone(),
        }
    }
}

/// Runs side effects at each lifecycle event without altering the stream.
pub struct HandleEvents<U, T, E> {
    upstream: U,
    hooks: EventHooks<T, E>,
}

impl<U, T, E> HandleEvents<U, T, E> {
    pub(crate) fn new(upstream: U, hooks: EventHooks<T, E>) -> Self {
        Self { upstream, hooks }
    }
}

impl<U: Clone, T, E> Clone for HandleEvents<U, T, E> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<U, T, E> Publisher for HandleEvents<U, T, E>
where
    U: Publisher<Output = T, Failure = E>,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        if let Some(hook) = &self.hooks.on_subscribe {
            hook();
        }
        let subscription = self.upstream.receive(HandleEventsSubscriber {
            downstream: subscriber,
            on_value: self.hooks.on_value.clone(),
            on_completion: self.hooks.on_completion.clone(),
        });
        if let Some(hook) = self.hooks.on_cancel.clone() {
            subscription.on_cancel(move || hook());
        }
        subscription
    }
}

struct HandleEventsSubscriber<S, T, E> {
    downstream: S,
    on_value: Option<ValueHook<T>>,
    on_completion: Option<CompletionHook<E>>,
}

impl<S, T, E> Subscriber<T, E> for HandleEventsSubscriber<S, T, E>
where
    S: Subscriber<T, E>,
    T: 'static,
    E: 'static,
{
    fn receive(&mut self, value: T) {
        if let Some(hook) = &self.on_value {
            hook(&value);
        }
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        if let Some(hook) = &self.on_completion {
            hook(&completion);
        }
        self.downstream.receive_completion(completion)
    }
}

/// Widens a stream that cannot fail to any failure type.
pub struct SetFailureType<U, E> {
    upstream: U,
    _failure: PhantomData<fn() -> E>,
}

impl<U, E> SetFailureType<U, E> {
    pub(crate) fn new(upstream: U) -> Self {
        Self {
            upstream,
            _failure: PhantomData,
        }
    }
}

impl<U: Clone, E> Clone for SetFailureType<U, E> {
    fn clone(&self) -> Self {
        Self::new(self.upstream.clone())
    }
}

impl<U, E> Publisher for SetFailureType<U, E>
where
    U: Publisher<Failure = Infallible>,
    E: Send + 'static,
{
    type Output = U::Output;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, E>,
    {
        self.upstream.receive(SetFailureTypeSubscriber {
            downstream: subscriber,
            _failure: PhantomData,
        })
    }
}

struct SetFailureTypeSubscriber<S, E> {
    downstream: S,
    _failure: PhantomData<fn() -> E>,
}

impl<S, T, E> Subscriber<T, Infallible> for SetFailureTypeSubscriber<S, E>
where
    S: Subscriber<T, E>,
    E: 'static,
{
    fn receive(&mut self, value: T) {
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<Infallible>) {
        match completion {
            Completion::Finished => self.downstream.receive_completion(Completion::Finished),
            Completion::Failure(never) => match never {},
        }
    }
}

/// Converts the failure value.
pub struct MapFailure<U, F> {
    upstream: U,
    transform: Arc<F>,
}

impl<U, F> MapFailure<U, F> {
    pub(crate) fn new(upstream: U, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

clone_operator!(MapFailure<U, F> { upstream, transform });

impl<U, F, E> Publisher for MapFailure<U, F>
where
    U: Publisher,
    F: Fn(U::Failure) -> E + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = U::Output;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, E>,
    {
        self.upstream.receive(MapFailureSubscriber {
            downstream: subscriber,
            transform: Arc::clone(&self.transform),
        })
    }
}

struct MapFailureSubscriber<S, F> {
    downstream: S,
    transform: Arc<F>,
}

impl<S, F, T, A, E> Subscriber<T, A> for MapFailureSubscriber<S, F>
where
    S: Subscriber<T, E>,
    F: Fn(A) -> E + Send + Sync + 'static,
{
    fn receive(&mut self, value: T) {
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<A>) {
        let transform = &self.transform;
        self.downstream
            .receive_completion(completion.map_failure(|error| transform(error)))
    }
}

/// Replaces a failure with one final value and a normal finish.
pub struct ReplaceError<U, T> {
    upstream: U,
    replacement: T,
}

impl<U, T> ReplaceError<U, T> {
    pub(crate) fn new(upstream: U, replacement: T) -> Self {
        Self {
            upstream,
            replacement,
        }
    }
}

impl<U: Clone, T: Clone> Clone for ReplaceError<U, T> {
    fn clone(&self) -> Self {
        Self::new(self.upstream.clone(), self.replacement.clone())
    }
}

impl<U, T> Publisher for ReplaceError<U, T>
where
    U: Publisher<Output = T>,
    T: Clone + Send + 'static,
{
    type Output = T;
    type Failure = Infallible;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, Infallible>,
    {
        self.upstream.receive(ReplaceErrorSubscriber {
            downstream: subscriber,
            replacement: self.replacement.clone(),
        })
    }
}

struct ReplaceErrorSubscriber<S, T> {
    downstream: S,
    replacement: T,
}

impl<S, T, E> Subscriber<T, E> for ReplaceErrorSubscriber<S, T>
where
    S: Subscriber<T, Infallible>,
    T: Clone + Send + 'static,
{
    fn receive(&mut self, value: T) {
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        if let Completion::Failure(_) = completion {
            self.downstream.receive(self.replacement.clone());
        }
        self.downstream.receive_completion(Completion::Finished)
    }
}
