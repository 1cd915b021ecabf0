use std::sync::Arc;

use crate::affine::ContextPublisher;
use crate::stream::{Completion, Publisher, Subscriber, Subscription};

use super::registry::SubscriberRegistry;

/// A subject holding a current value.
///
/// Each new subscriber first receives the current value, then every later
/// write. All reads and writes must happen on the designated context;
/// subscribing is allowed from anywhere. After completion, writes are ignored
/// and late subscribers receive only the completion.
pub struct ReplaySubject<T, E> {
    registry: Arc<SubscriberRegistry<T, E>>,
}

impl<T, E> ReplaySubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::replaying(value)),
        }
    }

    #[track_caller]
    pub fn value(&self) -> T {
        match self.registry.current("ReplaySubject::value") {
            Some(value) => value,
            None => unreachable!("a replaying registry always holds a value"),
        }
    }

    pub fn set_value(&self, value: T) {
        self.registry.broadcast("ReplaySubject::set_value", value);
    }

    pub fn send(&self, value: T) {
        self.registry.broadcast("ReplaySubject::send", value);
    }

    pub fn send_completion(&self, completion: Completion<E>) {
        self.registry
            .complete("ReplaySubject::send_completion", completion);
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscriber_count("ReplaySubject::subscriber_count")
    }

    pub fn is_completed(&self) -> bool {
        self.registry.is_completed("ReplaySubject::is_completed")
    }
}

impl<T, E> Clone for ReplaySubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T, E> std::fmt::Debug for ReplaySubject<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReplaySubject { .. }")
    }
}

impl<T, E> Publisher for ReplaySubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        self.registry.subscribe(subscriber)
    }
}

impl<T, E> ContextPublisher for ReplaySubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
}
