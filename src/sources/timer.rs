use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::affine::ContextPublisher;
use crate::runloop::MainContext;
use crate::scheduler::ContextScheduler;
use crate::stream::{ConnectablePublisher, Publisher, Scheduler, Subscriber, Subscription};

use super::registry::SubscriberRegistry;

struct TimerShared {
    registry: Arc<SubscriberRegistry<DateTime<Utc>, Infallible>>,
    connection: Mutex<Option<Subscription>>,
}

/// Connectable periodic timer firing on the designated context.
///
/// Emits the wall-clock time of each firing. Nothing is emitted until
/// [`connect`](ConnectablePublisher::connect) is called; cancelling the
/// returned handle stops it. Use `autoconnect()` to tie the connection to
/// subscriber presence.
#[derive(Clone)]
pub struct ContextTimer {
    interval: Duration,
    tolerance: Duration,
    shared: Arc<TimerShared>,
}

impl ContextTimer {
    /// A timer using the configured default timer tolerance.
    pub fn new(interval: Duration) -> Self {
        Self::with_tolerance(interval, MainContext::global().default_timer_tolerance())
    }

    pub fn with_tolerance(interval: Duration, tolerance: Duration) -> Self {
        Self {
            interval,
            tolerance,
            shared: Arc::new(TimerShared {
                registry: Arc::new(SubscriberRegistry::new()),
                connection: Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn is_connected(&self) -> bool {
        self.shared
            .connection
            .lock()
            .as_ref()
            .is_some_and(|connection| !connection.is_cancelled())
    }
}

impl std::fmt::Debug for ContextTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextTimer")
            .field("interval", &self.interval)
            .field("tolerance", &self.tolerance)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Publisher for ContextTimer {
    type Output = DateTime<Utc>;
    type Failure = Infallible;

    fn receive<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<DateTime<Utc>, Infallible>,
    {
        self.shared.registry.subscribe(subscriber)
    }
}

impl ContextPublisher for ContextTimer {}

impl ConnectablePublisher for ContextTimer {
    fn connect(&self) -> Subscription {
        let mut connection = self.shared.connection.lock();
        if let Some(active) = connection.as_ref().filter(|active| !active.is_cancelled()) {
            return active.clone();
        }

        let registry = Arc::downgrade(&self.shared.registry);
        let token = ContextScheduler::shared().schedule_repeating(
            self.interval,
            self.interval,
            self.tolerance,
            move || {
                if let Some(registry) = registry.upgrade() {
                    registry.broadcast("ContextTimer tick", Utc::now());
                }
            },
        );
        debug!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "context timer connected"
        );
        *connection = Some(token.clone());
        token
    }
}
