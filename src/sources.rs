//! Tagged sources owned by the designated context: subjects, a one-shot
//! future and a periodic timer.

mod broadcast;
mod future;
mod registry;
mod replay;
mod timer;

pub use broadcast::BroadcastSubject;
pub use future::{ContextFuture, Promise};
pub use replay::ReplaySubject;
pub use timer::ContextTimer;
