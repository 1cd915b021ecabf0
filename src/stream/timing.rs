//! Operators that move delivery onto a scheduler or act on time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::publisher::Publisher;
use super::relay::Relay;
use super::scheduler::Scheduler;
use super::subscriber::{Completion, Subscriber};
use super::subscription::Subscription;

/// Delivers every signal through `scheduler.schedule`.
#[derive(Clone)]
pub struct ReceiveOn<U, Sch> {
    upstream: U,
    scheduler: Sch,
}

impl<U, Sch> ReceiveOn<U, Sch> {
    pub(crate) fn new(upstream: U, scheduler: Sch) -> Self {
        Self {
            upstream,
            scheduler,
        }
    }
}

impl<U, Sch> Publisher for ReceiveOn<U, Sch>
where
    U: Publisher,
    Sch: Scheduler,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let attachment = self.upstream.receive(ReceiveOnSubscriber {
            relay: Arc::clone(&relay),
            scheduler: self.scheduler.clone(),
        });
        relay.upstream().add(attachment);
        subscription
    }
}

struct ReceiveOnSubscriber<S, T, E, Sch> {
    relay: Arc<Relay<S, T, E>>,
    scheduler: Sch,
}

impl<S, T, E, Sch> Subscriber<T, E> for ReceiveOnSubscriber<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn receive(&mut self, value: T) {
        let relay = Arc::clone(&self.relay);
        self.scheduler.schedule(move || relay.send(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let relay = Arc::clone(&self.relay);
        self.scheduler.schedule(move || relay.complete(completion));
    }
}

/// Shifts every signal, completion included, later by `interval`.
#[derive(Clone)]
pub struct Delay<U, Sch> {
    upstream: U,
    interval: Duration,
    scheduler: Sch,
}

impl<U, Sch> Delay<U, Sch> {
    pub(crate) fn new(upstream: U, interval: Duration, scheduler: Sch) -> Self {
        Self {
            upstream,
            interval,
            scheduler,
        }
    }
}

impl<U, Sch> Publisher for Delay<U, Sch>
where
    U: Publisher,
    Sch: Scheduler,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let attachment = self.upstream.receive(DelaySubscriber {
            relay: Arc::clone(&relay),
            interval: self.interval,
            scheduler: self.scheduler.clone(),
        });
        relay.upstream().add(attachment);
        subscription
    }
}

struct DelaySubscriber<S, T, E, Sch> {
    relay: Arc<Relay<S, T, E>>,
    interval: Duration,
    scheduler: Sch,
}

impl<S, T, E, Sch> Subscriber<T, E> for DelaySubscriber<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn receive(&mut self, value: T) {
        let relay = Arc::clone(&self.relay);
        let tolerance = self.scheduler.minimum_tolerance();
        self.scheduler
            .schedule_after(self.interval, tolerance, move || relay.send(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let relay = Arc::clone(&self.relay);
        let tolerance = self.scheduler.minimum_tolerance();
        self.scheduler
            .schedule_after(self.interval, tolerance, move || relay.complete(completion));
    }
}

/// Emits a value only after `due` has passed without a newer one. A pending
/// value is flushed before a normal finish.
#[derive(Clone)]
pub struct Debounce<U, Sch> {
    upstream: U,
    due: Duration,
    scheduler: Sch,
}

impl<U, Sch> Debounce<U, Sch> {
    pub(crate) fn new(upstream: U, due: Duration, scheduler: Sch) -> Self {
        Self {
            upstream,
            due,
            scheduler,
        }
    }
}

struct Quiet<T> {
    latest: Option<T>,
    generation: u64,
}

impl<U, Sch> Publisher for Debounce<U, Sch>
where
    U: Publisher,
    Sch: Scheduler,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let attachment = self.upstream.receive(DebounceSubscriber {
            relay: Arc::clone(&relay),
            quiet: Arc::new(Mutex::new(Quiet {
                latest: None,
                generation: 0,
            })),
            due: self.due,
            scheduler: self.scheduler.clone(),
        });
        relay.upstream().add(attachment);
        subscription
    }
}

struct DebounceSubscriber<S, T, E, Sch> {
    relay: Arc<Relay<S, T, E>>,
    quiet: Arc<Mutex<Quiet<T>>>,
    due: Duration,
    scheduler: Sch,
}

impl<S, T, E, Sch> Subscriber<T, E> for DebounceSubscriber<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn receive(&mut self, value: T) {
        let generation = {
            let mut quiet = self.quiet.lock();
            quiet.generation += 1;
            quiet.latest = Some(value);
            quiet.generation
        };
        let relay = Arc::clone(&self.relay);
        let quiet = Arc::clone(&self.quiet);
        let tolerance = self.scheduler.minimum_tolerance();
        self.scheduler.schedule_after(self.due, tolerance, move || {
            let ready = {
                let mut quiet = quiet.lock();
                if quiet.generation != generation {
                    return;
                }
                quiet.latest.take()
            };
            if let Some(value) = ready {
                relay.send(value);
            }
        });
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let relay = Arc::clone(&self.relay);
        let quiet = Arc::clone(&self.quiet);
        self.scheduler.schedule(move || {
            let pending = {
                let mut quiet = quiet.lock();
                quiet.generation += 1;
                quiet.latest.take()
            };
            if let (Some(value), true) = (pending, completion.is_finished()) {
                relay.push_value(value);
            }
            relay.complete(completion);
        });
    }
}

/// Emits at most one value per `interval`. The first value passes at once;
/// later ones within the window collapse to the latest (or the first).
#[derive(Clone)]
pub struct Throttle<U, Sch> {
    upstream: U,
    interval: Duration,
    scheduler: Sch,
    latest: bool,
}

impl<U, Sch> Throttle<U, Sch> {
    pub(crate) fn new(upstream: U, interval: Duration, scheduler: Sch, latest: bool) -> Self {
        Self {
            upstream,
            interval,
            scheduler,
            latest,
        }
    }
}

struct Window<T> {
    last_emit: Option<Instant>,
    pending: Option<T>,
    armed: bool,
}

impl<U, Sch> Publisher for Throttle<U, Sch>
where
    U: Publisher,
    Sch: Scheduler,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let attachment = self.upstream.receive(ThrottleSubscriber {
            relay: Arc::clone(&relay),
            window: Arc::new(Mutex::new(Window {
                last_emit: None,
                pending: None,
                armed: false,
            })),
            interval: self.interval,
            scheduler: self.scheduler.clone(),
            latest: self.latest,
        });
        relay.upstream().add(attachment);
        subscription
    }
}

struct ThrottleSubscriber<S, T, E, Sch> {
    relay: Arc<Relay<S, T, E>>,
    window: Arc<Mutex<Window<T>>>,
    interval: Duration,
    scheduler: Sch,
    latest: bool,
}

impl<S, T, E, Sch> Subscriber<T, E> for ThrottleSubscriber<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn receive(&mut self, value: T) {
        let now = self.scheduler.now();
        let mut window = self.window.lock();
        let open = !window.armed
            && window
                .last_emit
                .map_or(true, |at| now.saturating_duration_since(at) >= self.interval);
        if open {
            window.last_emit = Some(now);
            drop(window);
            let relay = Arc::clone(&self.relay);
            self.scheduler.schedule(move || relay.send(value));
            return;
        }

        if self.latest || window.pending.is_none() {
            window.pending = Some(value);
        }
        if window.armed {
            return;
        }
        window.armed = true;
        let wait = window
            .last_emit
            .map(|at| self.interval.saturating_sub(now.saturating_duration_since(at)))
            .unwrap_or_default();
        drop(window);

        let relay = Arc::clone(&self.relay);
        let shared = Arc::clone(&self.window);
        let scheduler = self.scheduler.clone();
        let tolerance = self.scheduler.minimum_tolerance();
        self.scheduler.schedule_after(wait, tolerance, move || {
            let ready = {
                let mut window = shared.lock();
                window.armed = false;
                let ready = window.pending.take();
                if ready.is_some() {
                    window.last_emit = Some(scheduler.now());
                }
                ready
            };
            if let Some(value) = ready {
                relay.send(value);
            }
        });
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let relay = Arc::clone(&self.relay);
        let window = Arc::clone(&self.window);
        self.scheduler.schedule(move || {
            let pending = window.lock().pending.take();
            if let (Some(value), true) = (pending, completion.is_finished()) {
                relay.push_value(value);
            }
            relay.complete(completion);
        });
    }
}

type ErrorFactory<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Ends the stream when `interval` passes without a value, measured from
/// subscription and from each value. Fails with the custom error if one is
/// given, otherwise finishes.
pub struct Timeout<U, Sch, E> {
    upstream: U,
    interval: Duration,
    scheduler: Sch,
    custom_error: Option<ErrorFactory<E>>,
}

impl<U, Sch, E> Timeout<U, Sch, E> {
    pub(crate) fn new(
        upstream: U,
        interval: Duration,
        scheduler: Sch,
        custom_error: Option<Box<dyn Fn() -> E + Send + Sync>>,
    ) -> Self {
        Self {
            upstream,
            interval,
            scheduler,
            custom_error: custom_error.map(Arc::from),
        }
    }
}

impl<U: Clone, Sch: Clone, E> Clone for Timeout<U, Sch, E> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            interval: self.interval,
            scheduler: self.scheduler.clone(),
            custom_error: self.custom_error.clone(),
        }
    }
}

struct Watchdog<S, T, E, Sch> {
    relay: Arc<Relay<S, T, E>>,
    generation: Arc<Mutex<u64>>,
    interval: Duration,
    scheduler: Sch,
    custom_error: Option<ErrorFactory<E>>,
}

impl<S, T, E, Sch> Watchdog<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn arm(&self, generation: u64) {
        let relay = Arc::clone(&self.relay);
        let current = Arc::clone(&self.generation);
        let custom_error = self.custom_error.clone();
        let tolerance = self.scheduler.minimum_tolerance();
        self.scheduler.schedule_after(self.interval, tolerance, move || {
            if *current.lock() != generation {
                return;
            }
            let completion = match custom_error {
                Some(make_error) => Completion::Failure(make_error()),
                None => Completion::Finished,
            };
            relay.complete(completion);
        });
    }

    fn bump(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }
}

impl<U, Sch, E> Publisher for Timeout<U, Sch, E>
where
    U: Publisher<Failure = E>,
    Sch: Scheduler,
    E: Send + 'static,
{
    type Output = U::Output;
    type Failure = U::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<U::Output, U::Failure>,
    {
        let (relay, subscription) = Relay::new(subscriber);
        let watchdog = Watchdog {
            relay: Arc::clone(&relay),
            generation: Arc::new(Mutex::new(0)),
            interval: self.interval,
            scheduler: self.scheduler.clone(),
            custom_error: self.custom_error.clone(),
        };
        watchdog.arm(0);
        let attachment = self.upstream.receive(watchdog);
        relay.upstream().add(attachment);
        subscription
    }
}

impl<S, T, E, Sch> Subscriber<T, E> for Watchdog<S, T, E, Sch>
where
    S: Subscriber<T, E>,
    T: Send + 'static,
    E: Send + 'static,
    Sch: Scheduler,
{
    fn receive(&mut self, value: T) {
        let generation = self.bump();
        let relay = Arc::clone(&self.relay);
        self.scheduler.schedule(move || relay.send(value));
        self.arm(generation);
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.bump();
        let relay = Arc::clone(&self.relay);
        self.scheduler.schedule(move || relay.complete(completion));
    }
}
