//! Merge rules: defaults that every later layer overrides.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("context.thread_name", "mainline-context")?
        .set_default("context.minimum_tolerance_ms", 0i64)?
        .set_default("context.default_timer_tolerance_ms", 1i64)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
