//! The designated context primitive.
//!
//! A process-wide run loop bound to exactly one thread. Everything that must
//! "happen on the main context" ends up as a job in this loop's queue or runs
//! inline because the caller is already on the bound thread.

mod cell;
pub(crate) mod main_context;

pub use cell::ContextCell;
pub use main_context::MainContext;
