//! Operators that combine several publishers into one.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::publisher::{receive_linked, Publisher};
use super::relay::Relay;
use super::subscriber::{Completion, Subscriber};
use super::subscription::Subscription;
use super::transform::Map;

/// Everything from the prefix, then everything from the suffix.
pub struct Chain<A, B> {
    prefix: A,
    suffix: Arc<B>,
}

impl<A, B> Chain<A, B> {
    pub(crate) fn new(prefix: A, suffix: B) -> Self {
        Self {
            prefix,
            suffix: Arc::new(suffix),
        }
    }
}

impl<A: Clone, B> Clone for Chain<A, B> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            suffix: Arc::clone(&self.suffix),
        }
    }
}

impl<A, B> Publisher for Chain<A, B>
where
    A: Publisher,
    B: Publisher<Output = A::Output, Failure = A::Failure> + Send + Sync + 'static,
{
    type Output = A::Output;
    type Failure = A::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<A::Output, A::Failure>,
    {
        receive_linked(&self.prefix, |subscription| ChainSubscriber {
            downstream: Some(subscriber),
            suffix: Arc::clone(&self.suffix),
            subscription,
        })
    }
}

struct ChainSubscriber<S, B> {
    downstream: Option<S>,
    suffix: Arc<B>,
    subscription: Subscription,
}

impl<S, B, T, E> Subscriber<T, E> for ChainSubscriber<S, B>
where
    B: Publisher<Output = T, Failure = E> + Send + Sync + 'static,
    S: Subscriber<T, E>,
{
    fn receive(&mut self, value: T) {
        if let Some(downstream) = self.downstream.as_mut() {
            downstream.receive(value);
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let Some(mut downstream) = self.downstream.take() else {
            return;
        };
        match completion {
            Completion::Finished if !self.subscription.is_cancelled() => {
                let attachment = self.suffix.receive(downstream);
                self.subscription.add(attachment);
            }
            Completion::Finished => {}
            failure => downstream.receive_completion(failure),
        }
    }
}

/// Switches to a recovery publisher when the upstream fails.
pub struct Catch<U, F> {
    upstream: U,
    recover: Arc<F>,
}

impl<U, F> Catch<U, F> {
    pub(crate) fn new(upstream: U, recover: F) -> Self {
        Self {
            upstream,
            recover: Arc::new(recover),
        }
    }
}

impl<U: Clone, F> Clone for Catch<U, F> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            recover: Arc::clone(&self.recover),
        }
    }
}

impl<U, F, P> Publisher for Catch<U, F>
where
    U: Publisher,
    F: Fn(U::Failure) -> P + Send + Sync + 'static,
    P: Publisher<Output = U::Output>,
{
    type Output = U::Output;
    type Failure = P::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, P::Failure>,
    {
        receive_linked(&self.upstream, |subscription| CatchSubscriber {
            downstream: Some(subscriber),
            recover: Arc::clone(&self.recover),
            subscription,
        })
    }
}

struct CatchSubscriber<S, F> {
    downstream: Option<S>,
    recover: Arc<F>,
    subscription: Subscription,
}

impl<S, F, T, E, P> Subscriber<T, E> for CatchSubscriber<S, F>
where
    F: Fn(E) -> P + Send + Sync + 'static,
    P: Publisher<Output = T>,
    S: Subscriber<T, P::Failure>,
{
    fn receive(&mut self, value: T) {
        if let Some(downstream) = self.downstream.as_mut() {
            downstream.receive(value);
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let Some(mut downstream) = self.downstream.take() else {
            return;
        };
        match completion {
            Completion::Finished => downstream.receive_completion(Completion::Finished),
            Completion::Failure(error) => {
                if self.subscription.is_cancelled() {
                    return;
                }
                let recovery = (self.recover)(error);
                let attachment = recovery.receive(downstream);
                self.subscription.add(attachment);
            }
        }
    }
}

/// Interleaves two streams; finishes when both have finished.
#[derive(Clone)]
pub struct Merge<A, B> {
    a: A,
    b: B,
}

impl<A, B> Merge<A, B> {
    pub(crate) fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A, B> Publisher for Merge<A, B>
where
    A: Publisher,
    B: Publisher<Output = A::Output, Failure = A::Failure>,
{
    type Output = A::Output;
    type Failure = A::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<A::Output, A::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let remaining = Arc::new(Mutex::new(2usize));
        let a = self.a.receive(MergeSide {
            relay: Arc::clone(&relay),
            remaining: Arc::clone(&remaining),
        });
        relay.upstream().add(a);
        let b = self.b.receive(MergeSide {
            relay: Arc::clone(&relay),
            remaining,
        });
        relay.upstream().add(b);
        subscription
    }
}

/// Interleaves any number of streams of one type.
#[derive(Clone)]
pub struct MergeMany<P> {
    upstreams: Vec<P>,
}

impl<P> MergeMany<P> {
    pub fn new(upstreams: impl IntoIterator<Item = P>) -> Self {
        Self {
            upstreams: upstreams.into_iter().collect(),
        }
    }
}

impl<P: Publisher> Publisher for MergeMany<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<P::Output, P::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        if self.upstreams.is_empty() {
            relay.complete(Completion::Finished);
            return subscription;
        }
        let remaining = Arc::new(Mutex::new(self.upstreams.len()));
        for upstream in &self.upstreams {
            let attachment = upstream.receive(MergeSide {
                relay: Arc::clone(&relay),
                remaining: Arc::clone(&remaining),
            });
            relay.upstream().add(attachment);
        }
        subscription
    }
}

struct MergeSide<S, T, E> {
    relay: Arc<Relay<S, T, E>>,
    remaining: Arc<Mutex<usize>>,
}

impl<S, T, E> Subscriber<T, E> for MergeSide<S, T, E>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        self.relay.send(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => {
                let done = {
                    let mut remaining = self.remaining.lock();
                    *remaining = remaining.saturating_sub(1);
                    *remaining == 0
                };
                if done {
                    self.relay.complete(Completion::Finished);
                }
            }
            failure => self.relay.complete(failure),
        }
    }
}

/// Pairs the n-th value of each side; finishes when either side is finished
/// and drained.
#[derive(Clone)]
pub struct Zip<A, B> {
    a: A,
    b: B,
}

impl<A, B> Zip<A, B> {
    pub(crate) fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

struct ZipBuffers<L, R> {
    left: VecDeque<L>,
    right: VecDeque<R>,
    left_done: bool,
    right_done: bool,
}

struct ZipShared<S, L, R, E> {
    relay: Arc<Relay<S, (L, R), E>>,
    buffers: Mutex<ZipBuffers<L, R>>,
}

impl<S, L, R, E> ZipShared<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn update(&self, apply: impl FnOnce(&mut ZipBuffers<L, R>)) {
        {
            let mut buffers = self.buffers.lock();
            apply(&mut buffers);
            while !buffers.left.is_empty() && !buffers.right.is_empty() {
                if let (Some(left), Some(right)) =
                    (buffers.left.pop_front(), buffers.right.pop_front())
                {
                    self.relay.push_value((left, right));
                }
            }
            let exhausted = (buffers.left_done && buffers.left.is_empty())
                || (buffers.right_done && buffers.right.is_empty());
            if exhausted {
                self.relay.push_completion(Completion::Finished);
            }
        }
        self.relay.drain();
    }

    fn fail(&self, completion: Completion<E>) {
        self.relay.complete(completion);
    }
}

impl<A, B> Publisher for Zip<A, B>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
{
    type Output = (A::Output, B::Output);
    type Failure = A::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<(A::Output, B::Output), A::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let shared = Arc::new(ZipShared {
            relay: Arc::clone(&relay),
            buffers: Mutex::new(ZipBuffers {
                left: VecDeque::new(),
                right: VecDeque::new(),
                left_done: false,
                right_done: false,
            }),
        });
        let a = self.a.receive(ZipLeft {
            shared: Arc::clone(&shared),
        });
        relay.upstream().add(a);
        let b = self.b.receive(ZipRight { shared });
        relay.upstream().add(b);
        subscription
    }
}

struct ZipLeft<S, L, R, E> {
    shared: Arc<ZipShared<S, L, R, E>>,
}

impl<S, L, R, E> Subscriber<L, E> for ZipLeft<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: L) {
        self.shared.update(|buffers| buffers.left.push_back(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.shared.update(|buffers| buffers.left_done = true),
            failure => self.shared.fail(failure),
        }
    }
}

struct ZipRight<S, L, R, E> {
    shared: Arc<ZipShared<S, L, R, E>>,
}

impl<S, L, R, E> Subscriber<R, E> for ZipRight<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: R) {
        self.shared.update(|buffers| buffers.right.push_back(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.shared.update(|buffers| buffers.right_done = true),
            failure => self.shared.fail(failure),
        }
    }
}

/// Emits the latest value of each side whenever either side emits, once
/// both have emitted. Finishes when both sides have finished.
#[derive(Clone)]
pub struct CombineLatest<A, B> {
    a: A,
    b: B,
}

impl<A, B> CombineLatest<A, B> {
    pub(crate) fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

struct Latest<L, R> {
    left: Option<L>,
    right: Option<R>,
    finished: usize,
}

struct LatestShared<S, L, R, E> {
    relay: Arc<Relay<S, (L, R), E>>,
    latest: Mutex<Latest<L, R>>,
}

impl<S, L, R, E> LatestShared<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Send + 'static,
{
    fn update(&self, apply: impl FnOnce(&mut Latest<L, R>)) {
        {
            let mut latest = self.latest.lock();
            apply(&mut latest);
            if let (Some(left), Some(right)) = (&latest.left, &latest.right) {
                self.relay.push_value((left.clone(), right.clone()));
            }
        }
        self.relay.drain();
    }

    fn finish_side(&self) {
        let done = {
            let mut latest = self.latest.lock();
            latest.finished += 1;
            latest.finished == 2
        };
        if done {
            self.relay.complete(Completion::Finished);
        }
    }
}

impl<A, B> Publisher for CombineLatest<A, B>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
    A::Output: Clone,
    B::Output: Clone,
{
    type Output = (A::Output, B::Output);
    type Failure = A::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<(A::Output, B::Output), A::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let shared = Arc::new(LatestShared {
            relay: Arc::clone(&relay),
            latest: Mutex::new(Latest {
                left: None,
                right: None,
                finished: 0,
            }),
        });
        let a = self.a.receive(LatestLeft {
            shared: Arc::clone(&shared),
        });
        relay.upstream().add(a);
        let b = self.b.receive(LatestRight { shared });
        relay.upstream().add(b);
        subscription
    }
}

struct LatestLeft<S, L, R, E> {
    shared: Arc<LatestShared<S, L, R, E>>,
}

impl<S, L, R, E> Subscriber<L, E> for LatestLeft<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: L) {
        self.shared.update(|latest| latest.left = Some(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.shared.finish_side(),
            failure => self.shared.relay.complete(failure),
        }
    }
}

struct LatestRight<S, L, R, E> {
    shared: Arc<LatestShared<S, L, R, E>>,
}

impl<S, L, R, E> Subscriber<R, E> for LatestRight<S, L, R, E>
where
    S: Subscriber<(L, R), E>,
    L: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: R) {
        self.shared.update(|latest| latest.right = Some(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.shared.finish_side(),
            failure => self.shared.relay.complete(failure),
        }
    }
}

/// Maps each value to an inner publisher and merges all of them. Finishes
/// once the upstream and every inner publisher have finished.
pub struct FlatMap<U, F> {
    upstream: U,
    transform: Arc<F>,
}

impl<U, F> FlatMap<U, F> {
    pub(crate) fn new(upstream: U, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

impl<U: Clone, F> Clone for FlatMap<U, F> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

/// Inner attachments still running, keyed by id. A finished inner is removed
/// so a long-lived upstream does not accumulate dead subscriptions.
#[derive(Default)]
struct Activity {
    live: HashMap<u64, Option<Subscription>>,
    next_id: u64,
    upstream_done: bool,
    torn_down: bool,
}

impl Activity {
    fn finish_inner(&mut self, id: u64) -> bool {
        self.live.remove(&id);
        self.upstream_done && self.live.is_empty()
    }
}

impl<U, F, P> Publisher for FlatMap<U, F>
where
    U: Publisher,
    F: Fn(U::Output) -> P + Send + Sync + 'static,
    P: Publisher<Failure = U::Failure>,
{
    type Output = P::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<P::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let activity = Arc::new(Mutex::new(Activity::default()));
        let teardown = Arc::clone(&activity);
        relay.upstream().on_cancel(move || {
            let live = {
                let mut activity = teardown.lock();
                activity.torn_down = true;
                std::mem::take(&mut activity.live)
            };
            for attachment in live.into_values().flatten() {
                attachment.cancel();
            }
        });
        let outer = FlatMapOuter {
            relay: Arc::clone(&relay),
            activity,
            transform: Arc::clone(&self.transform),
        };
        let attachment = self.upstream.receive(outer);
        relay.upstream().add(attachment);
        subscription
    }
}

struct FlatMapOuter<S, F, T, E> {
    relay: Arc<Relay<S, T, E>>,
    activity: Arc<Mutex<Activity>>,
    transform: Arc<F>,
}

impl<S, F, A, P, T, E> Subscriber<A, E> for FlatMapOuter<S, F, T, E>
where
    F: Fn(A) -> P + Send + Sync + 'static,
    P: Publisher<Output = T, Failure = E>,
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: A) {
        if !self.relay.is_open() {
            return;
        }
        let inner = (self.transform)(value);
        let id = {
            let mut activity = self.activity.lock();
            if activity.torn_down {
                return;
            }
            let id = activity.next_id;
            activity.next_id += 1;
            activity.live.insert(id, None);
            id
        };
        let attachment = inner.receive(FlatMapInner {
            id,
            relay: Arc::clone(&self.relay),
            activity: Arc::clone(&self.activity),
        });

        let mut activity = self.activity.lock();
        if activity.torn_down {
            drop(activity);
            attachment.cancel();
        } else if let Some(slot) = activity.live.get_mut(&id) {
            *slot = Some(attachment);
        }
        // Otherwise the inner already finished during `receive`.
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => {
                let done = {
                    let mut activity = self.activity.lock();
                    activity.upstream_done = true;
                    activity.live.is_empty()
                };
                if done {
                    self.relay.complete(Completion::Finished);
                }
            }
            failure => self.relay.complete(failure),
        }
    }
}

struct FlatMapInner<S, T, E> {
    id: u64,
    relay: Arc<Relay<S, T, E>>,
    activity: Arc<Mutex<Activity>>,
}

impl<S, T, E> Subscriber<T, E> for FlatMapInner<S, T, E>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        self.relay.send(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => {
                let done = self.activity.lock().finish_inner(self.id);
                if done {
                    self.relay.complete(Completion::Finished);
                }
            }
            failure => {
                self.activity.lock().live.remove(&self.id);
                self.relay.complete(failure)
            }
        }
    }
}

type Out<P> = <P as Publisher>::Output;

pub type Merge3<A, B, C> = Merge<Merge<A, B>, C>;
pub type Merge4<A, B, C, D> = Merge<Merge<Merge<A, B>, C>, D>;

pub type Zip3<A, B, C> = Map<
    Zip<Zip<A, B>, C>,
    fn(((Out<A>, Out<B>), Out<C>)) -> (Out<A>, Out<B>, Out<C>),
>;
pub type Zip4<A, B, C, D> = Map<
    Zip<Zip<Zip<A, B>, C>, D>,
    fn((((Out<A>, Out<B>), Out<C>), Out<D>)) -> (Out<A>, Out<B>, Out<C>, Out<D>),
>;

pub type CombineLatest3<A, B, C> = Map<
    CombineLatest<CombineLatest<A, B>, C>,
    fn(((Out<A>, Out<B>), Out<C>)) -> (Out<A>, Out<B>, Out<C>),
>;
pub type CombineLatest4<A, B, C, D> = Map<
    CombineLatest<CombineLatest<CombineLatest<A, B>, C>, D>,
    fn((((Out<A>, Out<B>), Out<C>), Out<D>)) -> (Out<A>, Out<B>, Out<C>, Out<D>),
>;

fn flatten3<A, B, C>(((a, b), c): ((A, B), C)) -> (A, B, C) {
    (a, b, c)
}

fn flatten4<A, B, C, D>((((a, b), c), d): (((A, B), C), D)) -> (A, B, C, D) {
    (a, b, c, d)
}

pub fn merge3<A, B, C>(a: A, b: B, c: C) -> Merge3<A, B, C>
where
    A: Publisher,
    B: Publisher<Output = A::Output, Failure = A::Failure>,
    C: Publisher<Output = A::Output, Failure = A::Failure>,
{
    Merge::new(Merge::new(a, b), c)
}

pub fn merge4<A, B, C, D>(a: A, b: B, c: C, d: D) -> Merge4<A, B, C, D>
where
    A: Publisher,
    B: Publisher<Output = A::Output, Failure = A::Failure>,
    C: Publisher<Output = A::Output, Failure = A::Failure>,
    D: Publisher<Output = A::Output, Failure = A::Failure>,
{
    Merge::new(Merge::new(Merge::new(a, b), c), d)
}

pub fn zip3<A, B, C>(a: A, b: B, c: C) -> Zip3<A, B, C>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
    C: Publisher<Failure = A::Failure>,
{
    let flatten: fn(((Out<A>, Out<B>), Out<C>)) -> (Out<A>, Out<B>, Out<C>) = flatten3;
    Map::new(Zip::new(Zip::new(a, b), c), flatten)
}

pub fn zip4<A, B, C, D>(a: A, b: B, c: C, d: D) -> Zip4<A, B, C, D>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
    C: Publisher<Failure = A::Failure>,
    D: Publisher<Failure = A::Failure>,
{
    let flatten: fn((((Out<A>, Out<B>), Out<C>), Out<D>)) -> (Out<A>, Out<B>, Out<C>, Out<D>) =
        flatten4;
    Map::new(Zip::new(Zip::new(Zip::new(a, b), c), d), flatten)
}

pub fn combine_latest3<A, B, C>(a: A, b: B, c: C) -> CombineLatest3<A, B, C>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
    C: Publisher<Failure = A::Failure>,
    A::Output: Clone,
    B::Output: Clone,
    C::Output: Clone,
{
    let flatten: fn(((Out<A>, Out<B>), Out<C>)) -> (Out<A>, Out<B>, Out<C>) = flatten3;
    Map::new(CombineLatest::new(CombineLatest::new(a, b), c), flatten)
}

pub fn combine_latest4<A, B, C, D>(a: A, b: B, c: C, d: D) -> CombineLatest4<A, B, C, D>
where
    A: Publisher,
    B: Publisher<Failure = A::Failure>,
    C: Publisher<Failure = A::Failure>,
    D: Publisher<Failure = A::Failure>,
    A::Output: Clone,
    B::Output: Clone,
    C::Output: Clone,
    D::Output: Clone,
{
    let flatten: fn((((Out<A>, Out<B>), Out<C>), Out<D>)) -> (Out<A>, Out<B>, Out<C>, Out<D>) =
        flatten4;
    Map::new(
        CombineLatest::new(CombineLatest::new(CombineLatest::new(a, b), c), d),
        flatten,
    )
}
