//! Subscriber bookkeeping shared by the subjects and the timer.
//!
//! State lives in a [`ContextCell`]; subscriptions made off the context are
//! registered by a hop through [`ContextScheduler`]. Delivery happens outside
//! the cell borrow through each subscriber's relay, so a subscriber may write
//! back into the subject from its callback.

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::runloop::ContextCell;
use crate::scheduler::ContextScheduler;
use crate::stream::{Completion, Relay, Scheduler, Subscriber, Subscription};

type Entry<T, E> = Arc<Relay<Box<dyn Subscriber<T, E>>, T, E>>;

struct Registry<T, E> {
    entries: Vec<(u64, Entry<T, E>)>,
    next_id: u64,
    current: Option<T>,
    completion: Option<Completion<E>>,
}

pub(crate) struct SubscriberRegistry<T, E> {
    state: ContextCell<Registry<T, E>>,
}

enum Attached<T, E> {
    Live { id: u64, replay: Option<T> },
    Completed(Completion<E>),
}

impl<T, E> SubscriberRegistry<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A registry without a current value.
    pub(crate) fn new() -> Self {
        Self::with_current(None)
    }

    /// A registry that replays its current value to each new subscriber.
    pub(crate) fn replaying(initial: T) -> Self {
        Self::with_current(Some(initial))
    }

    fn with_current(current: Option<T>) -> Self {
        Self {
            state: ContextCell::new(Registry {
                entries: Vec::new(),
                next_id: 0,
                current,
                completion: None,
            }),
        }
    }

    /// Attach from any thread. Registration happens on the context.
    pub(crate) fn subscribe<S>(self: &Arc<Self>, subscriber: S) -> Subscription
    where
        S: Subscriber<T, E>,
    {
        let boxed: Box<dyn Subscriber<T, E>> = Box::new(subscriber);
        let (relay, subscription) = Relay::new(boxed);
        let registry = Arc::clone(self);
        ContextScheduler::shared().schedule(move || registry.attach(relay));
        subscription
    }

    fn attach(self: &Arc<Self>, relay: Entry<T, E>) {
        let subscription = relay.subscription().clone();
        if subscription.is_cancelled() {
            return;
        }

        let attached = self.state.with("subject subscription", |registry| {
            if let Some(completion) = &registry.completion {
                return Attached::Completed(completion.clone());
            }
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::clone(&relay)));
            Attached::Live {
                id,
                replay: registry.current.clone(),
            }
        });

        match attached {
            Attached::Completed(completion) => relay.complete(completion),
            Attached::Live { id, replay } => {
                trace!(id, "subscriber registered");
                let registry = Arc::downgrade(self);
                subscription.on_cancel(move || detach_later(registry, id));
                if let Some(value) = replay {
                    relay.send(value);
                }
            }
        }
    }

    fn detach(&self, id: u64) {
        self.state.with("subject cancellation", |registry| {
            registry.entries.retain(|(entry, _)| *entry != id);
        });
        trace!(id, "subscriber removed");
    }

    /// Deliver `value` to every current subscriber. For replaying registries
    /// the value becomes current first. Ignored after completion.
    pub(crate) fn broadcast(&self, operation: &str, value: T) {
        let targets = self.state.with(operation, |registry| {
            if registry.completion.is_some() {
                return Vec::new();
            }
            if registry.current.is_some() {
                registry.current = Some(value.clone());
            }
            registry
                .entries
                .iter()
                .map(|(_, entry)| Arc::clone(entry))
                .collect::<Vec<_>>()
        });
        for target in targets {
            target.send(value.clone());
        }
    }

    /// Record the completion and deliver it. Only the first one counts.
    pub(crate) fn complete(&self, operation: &str, completion: Completion<E>) {
        let targets = self.state.with(operation, |registry| {
            if registry.completion.is_some() {
                return Vec::new();
            }
            registry.completion = Some(completion.clone());
            std::mem::take(&mut registry.entries)
        });
        for (_, target) in targets {
            target.complete(completion.clone());
        }
    }

    pub(crate) fn current(&self, operation: &str) -> Option<T> {
        self.state.with(operation, |registry| registry.current.clone())
    }

    pub(crate) fn subscriber_count(&self, operation: &str) -> usize {
        self.state.with(operation, |registry| registry.entries.len())
    }

    pub(crate) fn is_completed(&self, operation: &str) -> bool {
        self.state
            .with(operation, |registry| registry.completion.is_some())
    }
}

fn detach_later<T, E>(registry: Weak<SubscriberRegistry<T, E>>, id: u64)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    ContextScheduler::shared().schedule(move || {
        if let Some(registry) = registry.upgrade() {
            registry.detach(id);
        }
    });
}
