//! Entry point that assembles the configuration layers.

use std::path::Path;

use config::{Config, Environment, File};
use tracing::debug;

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::MainlineConfig;
use crate::error::ConfigError;

/// Loads [`MainlineConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest to highest: defaults, global file, workspace
    /// `config/config.toml`, workspace `config/{MAINLINE_ENV}.toml`,
    /// `MAINLINE__SECTION__KEY` environment variables.
    pub fn load(workspace_root: &Path) -> Result<MainlineConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(
            Environment::with_prefix("MAINLINE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: MainlineConfig = builder.build()?.try_deserialize()?;
        debug!(workspace_root = %workspace_root.display(), "configuration loaded");
        Ok(config)
    }

    /// Load configuration from a single file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<MainlineConfig, ConfigError> {
        let config: MainlineConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<MainlineConfig, ConfigError> {
        let config: Config = merge_policy::builder_with_defaults()?.build()?;
        Ok(config.try_deserialize()?)
    }
}
