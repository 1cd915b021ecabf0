//! The scheduler bound to the designated context.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::runloop::main_context::deadline_after;
use crate::runloop::MainContext;
use crate::stream::{Scheduler, Subscription};

const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Runs work on the designated context.
///
/// Immediate work runs inline when the caller is already on the context and
/// is queued otherwise, so an on-context caller observes the effect before
/// `schedule` returns. Delayed work never fires early; tolerance is at least
/// the context's configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextScheduler {
    _private: (),
}

impl ContextScheduler {
    pub const fn shared() -> Self {
        Self { _private: () }
    }

    pub fn context(&self) -> &'static MainContext {
        MainContext::global()
    }

    pub fn is_on_context(&self) -> bool {
        self.context().is_current()
    }

    #[track_caller]
    pub fn assert_on_context(&self, operation: &str) {
        self.context().assert_current(operation)
    }
}

impl Default for ContextScheduler {
    fn default() -> Self {
        Self::shared()
    }
}

impl Scheduler for ContextScheduler {
    fn now(&self) -> Instant {
        self.context().now()
    }

    fn minimum_tolerance(&self) -> Duration {
        self.context().minimum_tolerance()
    }

    fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let context = self.context();
        if context.is_current() {
            action();
        } else {
            trace!("queueing action for the designated context");
            context.enqueue(action);
        }
    }

    fn schedule_after<F>(&self, delay: Duration, tolerance: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let context = self.context();
        let tolerance = tolerance.max(context.minimum_tolerance());
        context.enqueue_after(deadline_after(context.now(), delay), tolerance, action);
    }

    fn schedule_repeating<F>(
        &self,
        start_delay: Duration,
        interval: Duration,
        tolerance: Duration,
        action: F,
    ) -> Subscription
    where
        F: FnMut() + Send + 'static,
    {
        let context = self.context();
        let token = Subscription::new();
        let repeating = Repeating {
            action,
            token: token.clone(),
            interval: interval.max(MIN_REPEAT_INTERVAL),
            tolerance: tolerance.max(context.minimum_tolerance()),
        };
        repeating.arm(context, deadline_after(context.now(), start_delay));
        token
    }
}

/// A periodic action re-armed as a one-shot timer after each firing.
/// Deadlines stay anchored to the first one; periods missed while the context
/// was busy are skipped rather than replayed.
struct Repeating<F> {
    action: F,
    token: Subscription,
    interval: Duration,
    tolerance: Duration,
}

impl<F> Repeating<F>
where
    F: FnMut() + Send + 'static,
{
    fn arm(self, context: &'static MainContext, deadline: Instant) {
        let tolerance = self.tolerance;
        context.enqueue_after(deadline, tolerance, move || self.fire(context, deadline));
    }

    fn fire(mut self, context: &'static MainContext, deadline: Instant) {
        if self.token.is_cancelled() {
            return;
        }
        (self.action)();
        if self.token.is_cancelled() {
            return;
        }
        let now = context.now();
        let mut next = deadline_after(deadline, self.interval);
        if next <= now {
            next = deadline_after(now, self.interval);
        }
        self.arm(context, next);
    }
}
