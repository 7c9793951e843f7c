//! Loader facade over the layered sources.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::EngineConfig;
use config::{ConfigError, File, FileFormat};
use std::path::Path;

/// Builds an [`EngineConfig`] from defaults, files and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, user file, `root/config/*.toml`, then environment.
    pub fn load(root: &Path) -> Result<EngineConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, root)?;
        builder
            .add_source(merge_policy::environment())
            .build()?
            .try_deserialize()
    }

    /// Defaults plus one explicit TOML file, without user or environment layers.
    pub fn load_from_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()?
            .try_deserialize()
    }

    /// Defaults, user file, an explicit file, then environment.
    pub fn load_with_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        builder
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(merge_policy::environment())
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only.
    pub fn defaults() -> EngineConfig {
        EngineConfig::default()
    }
}
