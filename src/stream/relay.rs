//! Serialized delivery to a downstream subscriber.
//!
//! Signals pushed while a delivery is in progress (re-entrantly from inside a
//! callback, or concurrently from another thread) are queued and delivered by
//! whoever is already delivering, in push order. No lock is held while the
//! downstream runs, so a callback may feed the same relay again.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::subscriber::{Completion, Gate, Signal, Subscriber};
use super::subscription::Subscription;

pub(crate) struct Relay<S, T, E> {
    pending: Mutex<Pending<T, E>>,
    downstream: Mutex<Gate<S, T, E>>,
    subscription: Subscription,
    upstream: Subscription,
}

struct Pending<T, E> {
    queue: VecDeque<Signal<T, E>>,
    delivering: bool,
    terminated: bool,
}

impl<S, T, E> Relay<S, T, E>
where
    S: Subscriber<T, E>,
{
    /// Returns the relay and the subscription handed to the downstream.
    /// Cancelling that subscription cancels [`upstream`](Self::upstream).
    pub(crate) fn new(subscriber: S) -> (Arc<Self>, Subscription) {
        let subscription = Subscription::new();
        let upstream = Subscription::new();
        subscription.add(upstream.clone());
        let relay = Arc::new(Self {
            pending: Mutex::new(Pending {
                queue: VecDeque::new(),
                delivering: false,
                terminated: false,
            }),
            downstream: Mutex::new(Gate::new(subscriber, subscription.clone())),
            subscription: subscription.clone(),
            upstream,
        });
        (relay, subscription)
    }

    /// Where upstream attachments are linked. Cancelled on termination.
    pub(crate) fn upstream(&self) -> &Subscription {
        &self.upstream
    }

    pub(crate) fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.subscription.is_cancelled() && !self.pending.lock().terminated
    }

    /// Queue a value without delivering it. Pair with [`drain`](Self::drain)
    /// once any caller-side lock is released.
    pub(crate) fn push_value(&self, value: T) {
        let mut pending = self.pending.lock();
        if !pending.terminated {
            pending.queue.push_back(Signal::Value(value));
        }
    }

    /// Queue the completion and detach from upstream. Later pushes are ignored.
    pub(crate) fn push_completion(&self, completion: Completion<E>) {
        {
            let mut pending = self.pending.lock();
            if pending.terminated {
                return;
            }
            pending.terminated = true;
            pending.queue.push_back(Signal::Completion(completion));
        }
        self.upstream.cancel();
    }

    pub(crate) fn drain(&self) {
        {
            let mut pending = self.pending.lock();
            if pending.delivering || pending.queue.is_empty() {
                return;
            }
            pending.delivering = true;
        }
        loop {
            let signal = {
                let mut pending = self.pending.lock();
                match pending.queue.pop_front() {
                    Some(signal) => signal,
                    None => {
                        pending.delivering = false;
                        return;
                    }
                }
            };
            self.downstream.lock().dispatch(signal);
        }
    }

    pub(crate) fn send(&self, value: T) {
        self.push_value(value);
        self.drain();
    }

    pub(crate) fn complete(&self, completion: Completion<E>) {
        self.push_completion(completion);
        self.drain();
    }
}
