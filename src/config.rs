//! Configuration System
//!
//! Layered configuration for the designated context and logging: built-in
//! defaults, then the user's global file, then workspace files, then
//! `MAINLINE__*` environment variables.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainlineConfig {
    /// Designated context settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Designated context settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Name given to the dedicated context thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Floor applied to every scheduler tolerance (milliseconds)
    #[serde(default)]
    pub minimum_tolerance_ms: u64,

    /// Tolerance for periodic timers that do not ask for one (milliseconds)
    #[serde(default = "default_timer_tolerance_ms")]
    pub default_timer_tolerance_ms: u64,
}

fn default_thread_name() -> String {
    "mainline-context".to_string()
}

fn default_timer_tolerance_ms() -> u64 {
    1
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            minimum_tolerance_ms: 0,
            default_timer_tolerance_ms: default_timer_tolerance_ms(),
        }
    }
}

impl ContextConfig {
    pub fn minimum_tolerance(&self) -> Duration {
        Duration::from_millis(self.minimum_tolerance_ms)
    }

    pub fn default_timer_tolerance(&self) -> Duration {
        Duration::from_millis(self.default_timer_tolerance_ms)
    }

    /// Validate context configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name.trim().is_empty() {
            return Err("Context thread name cannot be empty".to_string());
        }
        if self.thread_name.contains('\0') {
            return Err("Context thread name cannot contain NUL bytes".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Context(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Context(msg) => write!(f, "Context: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl MainlineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.context.validate() {
            errors.push(ValidationError::Context(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
