use std::time::{Duration, Instant};

use super::subscription::Subscription;

/// Where and when operator work runs.
pub trait Scheduler: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Smallest tolerance this scheduler honours.
    fn minimum_tolerance(&self) -> Duration;

    /// Run `action` as soon as possible.
    fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static;

    /// Run `action` no earlier than `delay` from now.
    fn schedule_after<F>(&self, delay: Duration, tolerance: Duration, action: F)
    where
        F: FnOnce() + Send + 'static;

    /// Run `action` first after `start_delay`, then every `interval`, until
    /// the returned subscription is cancelled.
    fn schedule_repeating<F>(
        &self,
        start_delay: Duration,
        interval: Duration,
        tolerance: Duration,
        action: F,
    ) -> Subscription
    where
        F: FnMut() + Send + 'static;
}
