use std::sync::Arc;

use crate::affine::ContextPublisher;
use crate::stream::{Completion, Publisher, Subscriber, Subscription};

use super::registry::SubscriberRegistry;

/// A subject without a current value. Subscribers see only writes made
/// after they attach. Writes must happen on the designated context.
pub struct BroadcastSubject<T, E> {
    registry: Arc<SubscriberRegistry<T, E>>,
}

impl<T, E> BroadcastSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
        }
    }

    pub fn send(&self, value: T) {
        self.registry.broadcast("BroadcastSubject::send", value);
    }

    pub fn send_completion(&self, completion: Completion<E>) {
        self.registry
            .complete("BroadcastSubject::send_completion", completion);
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .subscriber_count("BroadcastSubject::subscriber_count")
    }
}

impl<E> BroadcastSubject<(), E>
where
    E: Clone + Send + 'static,
{
    /// Emit a unit value.
    pub fn signal(&self) {
        self.registry.broadcast("BroadcastSubject::signal", ());
    }
}

impl<T, E> Default for BroadcastSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for BroadcastSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T, E> std::fmt::Debug for BroadcastSubject<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BroadcastSubject { .. }")
    }
}

impl<T, E> Publisher for BroadcastSubject<T, E>
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

impl<T, E> ContextPublisher for BroadcastSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
}
