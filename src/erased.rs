//! Type-erased context publisher.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::affine::ContextPublisher;
use crate::scheduler::ContextScheduler;
use crate::stream::{Completion, Publisher, Subscriber, Subscription};

trait ErasedPublisher<T, E>: Send + Sync {
    fn receive_boxed(&self, subscriber: Box<dyn Subscriber<T, E>>) -> Subscription;
}

impl<P> ErasedPublisher<P::Output, P::Failure> for P
where
    P: Publisher + Send + Sync,
{
    fn receive_boxed(&self, subscriber: Box<dyn Subscriber<P::Output, P::Failure>>) -> Subscription {
        self.receive(subscriber)
    }
}

/// A context publisher with its concrete type hidden.
///
/// Erasing a value that is already an `AnyContextPublisher` returns a handle
/// to the same box instead of nesting a second one.
pub struct AnyContextPublisher<T, E> {
    inner: Arc<dyn ErasedPublisher<T, E>>,
}

impl<T, E> AnyContextPublisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<P>(publisher: P) -> Self
    where
        P: ContextPublisher<Output = T, Failure = E> + Send + Sync + 'static,
    {
        Self::reuse(publisher).unwrap_or_else(|publisher| Self {
            inner: Arc::new(publisher),
        })
    }

    /// Erase a publisher the caller asserts delivers on the context. Every
    /// delivery is checked at runtime.
    pub fn assume<P>(publisher: P) -> Self
    where
        P: Publisher<Output = T, Failure = E> + Send + Sync + 'static,
    {
        Self::reuse(publisher).unwrap_or_else(|publisher| {
            debug!(
                publisher = std::any::type_name::<P>(),
                "publisher assumed to deliver on the designated context"
            );
            Self {
                inner: Arc::new(Checked { inner: publisher }),
            }
        })
    }

    fn reuse<P: 'static>(publisher: P) -> Result<Self, P> {
        match (&publisher as &dyn Any).downcast_ref::<Self>() {
            Some(erased) => Ok(erased.clone()),
            None => Err(publisher),
        }
    }

    /// Whether both handles share one box.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }
}

impl<T, E> Clone for AnyContextPublisher<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> std::fmt::Debug for AnyContextPublisher<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AnyContextPublisher")
    }
}

impl<T, E> Publisher for AnyContextPublisher<T, E>
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
        self.inner.receive_boxed(Box::new(subscriber))
    }
}

impl<T, E> ContextPublisher for AnyContextPublisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
}

/// Wraps an assumed publisher and verifies each delivery.
struct Checked<P> {
    inner: P,
}

impl<P: Publisher> Publisher for Checked<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<P::Output, P::Failure>,
    {
        self.inner.receive(CheckedSubscriber { downstream: subscriber })
    }
}

struct CheckedSubscriber<S> {
    downstream: S,
}

impl<S, T, E> Subscriber<T, E> for CheckedSubscriber<S>
where
    S: Subscriber<T, E>,
{
    fn receive(&mut self, value: T) {
        ContextScheduler::shared().assert_on_context("assumed context publisher value");
        self.downstream.receive(value)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        ContextScheduler::shared().assert_on_context("assumed context publisher completion");
        self.downstream.receive_completion(completion)
    }
}
