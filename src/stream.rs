//! Push-based stream core.
//!
//! Publishers deliver values and one terminal [`Completion`] to subscribers.
//! Every attachment yields a [`Subscription`]; cancelling it stops delivery
//! and tears down upstream attachments. Operators live on [`PublisherExt`].

mod combine;
mod connect;
mod publisher;
mod relay;
mod scheduler;
mod sources;
mod subscriber;
mod subscription;
mod timing;
mod transform;
mod values;

pub use combine::{
    combine_latest3, combine_latest4, merge3, merge4, zip3, zip4, Catch, Chain, CombineLatest,
    CombineLatest3, CombineLatest4, FlatMap, Merge, Merge3, Merge4, MergeMany, Zip, Zip3, Zip4,
};
pub use connect::{Autoconnect, ConnectablePublisher};
pub use publisher::{Publisher, PublisherExt};
pub use scheduler::Scheduler;
pub use sources::{Empty, Fail, Just, Sequence};
pub use subscriber::{Completion, Sink, Subscriber};
pub use subscription::{Subscription, SubscriptionGuard};
pub use timing::{Debounce, Delay, ReceiveOn, Throttle, Timeout};
pub use transform::{
    EventHooks, Filter, FilterMap, FirstWhere, HandleEvents, Map, MapFailure, RemoveDuplicates,
    ReplaceError, Scan, SetFailureType, Skip, SkipWhile, Take, TakeWhile, TryFilter, TryMap,
};
pub use values::Values;

pub(crate) use relay::Relay;
