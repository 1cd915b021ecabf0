use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::publisher::Publisher;
use super::subscriber::Subscriber;
use super::subscription::Subscription;

/// A publisher that produces nothing until explicitly connected.
pub trait ConnectablePublisher: Publisher {
    /// Start producing. Cancelling the returned handle disconnects.
    fn connect(&self) -> Subscription;

    /// Connect on the first subscriber and disconnect after the last one
    /// cancels.
    fn autoconnect(self) -> Autoconnect<Self>
    where
        Self: Sized,
    {
        Autoconnect::new(self)
    }
}

struct Connection {
    subscribers: usize,
    active: Option<Subscription>,
}

pub struct Autoconnect<P> {
    upstream: P,
    connection: Arc<Mutex<Connection>>,
}

impl<P> Autoconnect<P> {
    fn new(upstream: P) -> Self {
        Self {
            upstream,
            connection: Arc::new(Mutex::new(Connection {
                subscribers: 0,
                active: None,
            })),
        }
    }
}

impl<P: Clone> Clone for Autoconnect<P> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<P: ConnectablePublisher> Publisher for Autoconnect<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<P::Output, P::Failure>,
    {
        let subscription = self.upstream.receive(subscriber);
        {
            let mut connection = self.connection.lock();
            connection.subscribers += 1;
            if connection.active.is_none() {
                debug!("autoconnect: first subscriber, connecting");
                connection.active = Some(self.upstream.connect());
            }
        }

        let connection = Arc::clone(&self.connection);
        subscription.on_cancel(move || {
            let released = {
                let mut connection = connection.lock();
                connection.subscribers = connection.subscribers.saturating_sub(1);
                if connection.subscribers == 0 {
                    connection.active.take()
                } else {
                    None
                }
            };
            if let Some(active) = released {
                debug!("autoconnect: last subscriber gone, disconnecting");
                active.cancel();
            }
        });
        subscription
    }
}
