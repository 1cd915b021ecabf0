use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation handle for one attachment of a subscriber to a publisher.
///
/// Cloning yields another handle to the same attachment. Cancelling is
/// idempotent and runs every registered teardown exactly once.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    teardown: Mutex<Vec<Teardown>>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = std::mem::take(&mut *self.inner.teardown.lock());
        for action in teardown {
            action();
        }
    }

    /// Run `action` when this subscription is cancelled, or right away if it
    /// already is.
    pub fn on_cancel<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut teardown = self.inner.teardown.lock();
            if !self.is_cancelled() {
                teardown.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Cancel `child` together with this subscription.
    pub fn add(&self, child: Subscription) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.on_cancel(move || child.cancel());
    }

    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Owns a [`Subscription`] and cancels it on drop.
#[must_use = "dropping the guard cancels the subscription"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Option<Subscription>,
}

impl SubscriptionGuard {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription: Some(subscription),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.subscription
            .as_ref()
            .map_or(true, Subscription::is_cancelled)
    }

    pub fn cancel(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Give up ownership without cancelling.
    pub fn detach(mut self) -> Subscription {
        self.subscription.take().unwrap_or_default()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
