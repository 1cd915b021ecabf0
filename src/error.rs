//! Error types for the context-affine stream layer.
//!
//! Stream failures never appear here: they travel through
//! [`Completion::Failure`](crate::stream::Completion) untouched. Contract
//! violations are not errors either; they panic at the point of violation.

use std::thread::ThreadId;
use thiserror::Error;

/// Errors raised by the designated context primitive.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Designated context is already bound to thread {owner:?}")]
    AlreadyBound { owner: ThreadId },

    #[error("No thread has been designated as the context")]
    Unbound,

    #[error("{operation} must be called on the designated context")]
    NotOnContext { operation: &'static str },

    #[error("Context job was dropped before it produced a result")]
    Disconnected,

    #[error("Failed to spawn context thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration and ambient-setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
