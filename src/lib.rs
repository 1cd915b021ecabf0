//! Mainline: Context-Affine Push Streams
//!
//! A push-based stream layer where "this stream delivers on the designated
//! main context" is a property of the publisher's type. Sources owned by the
//! context carry the [`ContextPublisher`] tag, operators propagate it, and
//! context-only consumers such as
//! [`sink_on_context`](affine::ContextPublisherExt::sink_on_context) only
//! accept tagged publishers.
//!
//! ```compile_fail
//! use mainline::prelude::*;
//! use mainline::stream::Just;
//!
//! // `receive_on` an arbitrary scheduler drops the tag.
//! #[derive(Clone)]
//! struct Inline;
//! # impl Scheduler for Inline {
//! #     fn now(&self) -> std::time::Instant { std::time::Instant::now() }
//! #     fn minimum_tolerance(&self) -> std::time::Duration { std::time::Duration::ZERO }
//! #     fn schedule<F: FnOnce() + Send + 'static>(&self, f: F) { f() }
//! #     fn schedule_after<F: FnOnce() + Send + 'static>(&self, _: std::time::Duration, _: std::time::Duration, f: F) { f() }
//! #     fn schedule_repeating<F: FnMut() + Send + 'static>(&self, _: std::time::Duration, _: std::time::Duration, _: std::time::Duration, _: F) -> mainline::stream::Subscription { mainline::stream::Subscription::new() }
//! # }
//! let _guard = Just::new(1).receive_on(Inline).sink_value_on_context(|_| {});
//! ```

pub mod affine;
pub mod config;
pub mod erased;
pub mod error;
pub mod logging;
pub mod runloop;
pub mod scheduler;
pub mod sources;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use affine::{ContextPublisher, ContextPublisherExt, PublisherAffinityExt};
pub use config::{ConfigLoader, ContextConfig, MainlineConfig};
pub use erased::AnyContextPublisher;
pub use error::{ConfigError, ContextError};
pub use runloop::{ContextCell, MainContext};
pub use scheduler::ContextScheduler;
pub use sources::{BroadcastSubject, ContextFuture, ContextTimer, Promise, ReplaySubject};
pub use stream::{Completion, Publisher, PublisherExt, Subscription, SubscriptionGuard};

/// Traits needed to build and consume pipelines.
pub mod prelude {
    pub use crate::affine::{ContextPublisher, ContextPublisherExt, PublisherAffinityExt};
    pub use crate::stream::{ConnectablePublisher, Publisher, PublisherExt, Scheduler};
}

/// Validate `config`, apply its context settings and install logging.
pub fn init(config: &MainlineConfig) -> Result<(), ConfigError> {
    if let Err(errors) = config.validate() {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::Invalid(message));
    }
    MainContext::global().configure(&config.context);
    logging::init_logging(Some(&config.logging))
}
