use std::marker::PhantomData;

use super::subscription::Subscription;

/// Terminal event of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<E> {
    Finished,
    Failure(E),
}

impl<E> Completion<E> {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    pub fn failure(&self) -> Option<&E> {
        match self {
            Completion::Finished => None,
            Completion::Failure(error) => Some(error),
        }
    }

    pub fn map_failure<F>(self, transform: impl FnOnce(E) -> F) -> Completion<F> {
        match self {
            Completion::Finished => Completion::Finished,
            Completion::Failure(error) => Completion::Failure(transform(error)),
        }
    }
}

/// Receives the values and the single completion of a stream.
pub trait Subscriber<T, E>: Send + 'static {
    fn receive(&mut self, value: T);

    fn receive_completion(&mut self, completion: Completion<E>);
}

impl<T: 'static, E: 'static> Subscriber<T, E> for Box<dyn Subscriber<T, E>> {
    fn receive(&mut self, value: T) {
        (**self).receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        (**self).receive_completion(completion)
    }
}

/// Closure-backed subscriber.
pub struct Sink<FC, FV> {
    receive_completion: FC,
    receive_value: FV,
}

impl<FC, FV> Sink<FC, FV> {
    pub fn new(receive_completion: FC, receive_value: FV) -> Self {
        Self {
            receive_completion,
            receive_value,
        }
    }
}

impl<T, E, FC, FV> Subscriber<T, E> for Sink<FC, FV>
where
    FC: FnMut(Completion<E>) + Send + 'static,
    FV: FnMut(T) + Send + 'static,
{
    fn receive(&mut self, value: T) {
        (self.receive_value)(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        (self.receive_completion)(completion)
    }
}

/// Enforces the stream grammar on the way to a subscriber: nothing after
/// completion, nothing after cancellation.
pub(crate) struct Gate<S, T, E> {
    subscriber: S,
    subscription: Subscription,
    finished: bool,
    _signals: PhantomData<fn(T, E)>,
}

impl<S, T, E> Gate<S, T, E>
where
    S: Subscriber<T, E>,
{
    pub(crate) fn new(subscriber: S, subscription: Subscription) -> Self {
        Self {
            subscriber,
            subscription,
            finished: false,
            _signals: PhantomData,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.finished && !self.subscription.is_cancelled()
    }

    pub(crate) fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub(crate) fn send(&mut self, value: T) {
        if self.is_open() {
            self.subscriber.receive(value);
        }
    }

    pub(crate) fn complete(&mut self, completion: Completion<E>) {
        if self.is_open() {
            self.finished = true;
            self.subscriber.receive_completion(completion);
        }
    }

    /// Complete, then cancel everything linked upstream.
    pub(crate) fn finish(&mut self, completion: Completion<E>) {
        self.complete(completion);
        self.subscription.cancel();
    }

    pub(crate) fn dispatch(&mut self, signal: Signal<T, E>) {
        match signal {
            Signal::Value(value) => self.send(value),
            Signal::Completion(completion) => self.complete(completion),
        }
    }
}

pub(crate) enum Signal<T, E> {
    Value(T),
    Completion(Completion<E>),
}
