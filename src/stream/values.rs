//! Bridge from push streams into `futures::Stream`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};

use super::publisher::Publisher;
use super::subscriber::{Completion, Subscriber};
use super::subscription::SubscriptionGuard;

/// Values of a publisher as an async stream of `Result`s. A failure arrives
/// as the final `Err` item. Dropping the stream cancels the subscription.
pub struct Values<T, E> {
    receiver: UnboundedReceiver<Result<T, E>>,
    _subscription: SubscriptionGuard,
}

impl<T, E> Values<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn attach<P>(publisher: &P) -> Self
    where
        P: Publisher<Output = T, Failure = E> + ?Sized,
    {
        let (sender, receiver) = mpsc::unbounded();
        let subscription = publisher.receive(Forward { sender });
        Self {
            receiver,
            _subscription: SubscriptionGuard::new(subscription),
        }
    }
}

impl<T, E> Stream for Values<T, E> {
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

struct Forward<T, E> {
    sender: UnboundedSender<Result<T, E>>,
}

impl<T, E> Subscriber<T, E> for Forward<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn receive(&mut self, value: T) {
        let _ = self.sender.unbounded_send(Ok(value));
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        if let Completion::Failure(error) = completion {
            let _ = self.sender.unbounded_send(Err(error));
        }
        self.sender.close_channel();
    }
}
