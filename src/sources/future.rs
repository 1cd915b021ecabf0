use std::future::Future;
use std::sync::{Arc, Weak};

use tracing::error;

use crate::affine::ContextPublisher;
use crate::runloop::ContextCell;
use crate::scheduler::ContextScheduler;
use crate::stream::{Completion, Publisher, Relay, Scheduler, Subscriber, Subscription};

type Waiter<T, E> = Arc<Relay<Box<dyn Subscriber<T, E>>, T, E>>;

enum State<T, E> {
    Pending(Vec<Waiter<T, E>>),
    Resolved(Result<T, E>),
}

struct Shared<T, E> {
    state: ContextCell<State<T, E>>,
}

/// A one-shot result produced on the designated context.
///
/// The producer runs immediately on construction and receives a
/// [`Promise`]. Once resolved, every current and future subscriber gets the
/// value followed by a finish, or the failure.
pub struct ContextFuture<T, E> {
    shared: Arc<Shared<T, E>>,
}

/// Resolves a [`ContextFuture`]. Must be fulfilled on the context, once.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> ContextFuture<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    #[track_caller]
    pub fn new<F>(attempt: F) -> Self
    where
        F: FnOnce(Promise<T, E>),
    {
        ContextScheduler::shared().assert_on_context("ContextFuture::new");
        let shared = Arc::new(Shared {
            state: ContextCell::new(State::Pending(Vec::new())),
        });
        attempt(Promise {
            shared: Arc::clone(&shared),
        });
        Self { shared }
    }

    /// Run `future` on a tokio runtime and resolve on the context with its
    /// output.
    #[track_caller]
    pub fn spawn_on<Fut>(handle: &tokio::runtime::Handle, future: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(|promise| {
            handle.spawn(async move {
                let result = future.await;
                ContextScheduler::shared().schedule(move || promise.fulfill(result));
            });
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.state.with("ContextFuture::is_resolved", |state| {
            matches!(state, State::Resolved(_))
        })
    }

    fn attach(&self, waiter: Waiter<T, E>) {
        if waiter.subscription().is_cancelled() {
            return;
        }
        let resolved = self.shared.state.with("ContextFuture subscription", |state| match state {
            State::Pending(waiters) => {
                waiters.push(Arc::clone(&waiter));
                None
            }
            State::Resolved(result) => Some(result.clone()),
        });
        match resolved {
            Some(result) => deliver(&waiter, result),
            None => {
                let shared = Arc::downgrade(&self.shared);
                let cancelled = Arc::downgrade(&waiter);
                waiter
                    .subscription()
                    .on_cancel(move || forget_later(shared, cancelled));
            }
        }
    }
}

fn deliver<T, E>(waiter: &Waiter<T, E>, result: Result<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    match result {
        Ok(value) => {
            waiter.push_value(value);
            waiter.complete(Completion::Finished);
        }
        Err(error) => waiter.complete(Completion::Failure(error)),
    }
}

fn forget_later<T, E>(shared: Weak<Shared<T, E>>, waiter: Weak<Relay<Box<dyn Subscriber<T, E>>, T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    ContextScheduler::shared().schedule(move || {
        let (Some(shared), Some(waiter)) = (shared.upgrade(), waiter.upgrade()) else {
            return;
        };
        shared.state.with("ContextFuture cancellation", |state| {
            if let State::Pending(waiters) = state {
                waiters.retain(|candidate| !Arc::ptr_eq(candidate, &waiter));
            }
        });
    });
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Resolve the future. Fulfilling twice is a contract violation and
    /// panics without touching the stored result.
    #[track_caller]
    pub fn fulfill(&self, result: Result<T, E>) {
        let waiters = self.shared.state.with("Promise::fulfill", |state| {
            let State::Pending(waiters) = state else {
                return None;
            };
            let waiters = std::mem::take(waiters);
            *state = State::Resolved(result.clone());
            Some(waiters)
        });
        let Some(waiters) = waiters else {
            error!("contract violation: promise fulfilled more than once");
            panic!("contract violation: promise fulfilled more than once");
        };
        for waiter in waiters {
            deliver(&waiter, result.clone());
        }
    }

    #[track_caller]
    pub fn succeed(&self, value: T) {
        self.fulfill(Ok(value))
    }

    #[track_caller]
    pub fn fail(&self, error: E) {
        self.fulfill(Err(error))
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Clone for ContextFuture<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> std::fmt::Debug for ContextFuture<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContextFuture { .. }")
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Promise { .. }")
    }
}

impl<T, E> Publisher for ContextFuture<T, E>
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
        let boxed: Box<dyn Subscriber<T, E>> = Box::new(subscriber);
        let (waiter, subscription) = Relay::new(boxed);
        let future = self.clone();
        ContextScheduler::shared().schedule(move || future.attach(waiter));
        subscription
    }
}

impl<T, E> ContextPublisher for ContextFuture<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
}
