//! Immediate sources. They emit synchronously on the subscribing thread.

use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use super::publisher::Publisher;
use super::subscriber::{Completion, Gate, Subscriber};
use super::subscription::Subscription;

/// One value, then finished.
#[derive(Debug, Clone)]
pub struct Just<T> {
    value: T,
}

impl<T> Just<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Publisher for Just<T>
where
    T: Clone + Send + 'static,
{
    type Output = T;
    type Failure = Infallible;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, Infallible>,
    {
        let mut gate = Gate::new(subscriber, Subscription::new());
        gate.send(self.value.clone());
        gate.complete(Completion::Finished);
        gate.subscription().clone()
    }
}

/// Finishes immediately, or never emits anything at all.
#[derive(Debug)]
pub struct Empty<T, E> {
    complete_immediately: bool,
    _signals: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Empty<T, E> {
    pub fn new() -> Self {
        Self {
            complete_immediately: true,
            _signals: PhantomData,
        }
    }

    pub fn never() -> Self {
        Self {
            complete_immediately: false,
            _signals: PhantomData,
        }
    }
}

impl<T, E> Default for Empty<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Empty<T, E> {
    fn clone(&self) -> Self {
        Self {
            complete_immediately: self.complete_immediately,
            _signals: PhantomData,
        }
    }
}

impl<T, E> Publisher for Empty<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        let mut gate = Gate::new(subscriber, Subscription::new());
        if self.complete_immediately {
            gate.complete(Completion::Finished);
        }
        gate.subscription().clone()
    }
}

/// Fails immediately with a fixed error.
#[derive(Debug)]
pub struct Fail<T, E> {
    error: E,
    _output: PhantomData<fn() -> T>,
}

impl<T, E> Fail<T, E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            _output: PhantomData,
        }
    }
}

impl<T, E: Clone> Clone for Fail<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.error.clone())
    }
}

impl<T, E> Publisher for Fail<T, E>
where
    T: Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        let mut gate = Gate::new(subscriber, Subscription::new());
        gate.complete(Completion::Failure(self.error.clone()));
        gate.subscription().clone()
    }
}

/// Emits each element of a fixed list, then finishes.
#[derive(Debug)]
pub struct Sequence<T, E> {
    values: Arc<[T]>,
    _failure: PhantomData<fn() -> E>,
}

impl<T, E> Sequence<T, E> {
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            values: values.into_iter().collect(),
            _failure: PhantomData,
        }
    }
}

impl<T, E> Clone for Sequence<T, E> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
            _failure: PhantomData,
        }
    }
}

impl<T, E> Publisher for Sequence<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        let mut gate = Gate::new(subscriber, Subscription::new());
        for value in self.values.iter() {
            if !gate.is_open() {
                break;
            }
            gate.send(value.clone());
        }
        gate.complete(Completion::Finished);
        gate.subscription().clone()
    }
}
