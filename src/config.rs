//! Configuration System
//!
//! Layered engine configuration: merge-policy defaults, then the user config file, then the
//! working-directory config files, then `GENCOMPLETE_*` environment variables. Task-type entries
//! are folded into the completion registry once at startup; nothing here changes afterwards.

use crate::error::CompletionError;
use crate::logging::LoggingConfig;
use crate::registry::{CompletionConfig, CompletionRegistry};
use crate::tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tools: ToolConfig,

    /// Completion table entries keyed by task type; replace built-in entries of the same name.
    #[serde(default)]
    pub task_types: HashMap<String, CompletionConfig>,
}

/// Storage location for the sled-backed generation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

/// `<data dir>/store`, or `.gencomplete/store` when no home directory is known.
pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "gencomplete")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from(".gencomplete").join("store"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool types a task may request explicitly; empty keeps the built-in list.
    #[serde(default)]
    pub allowed_overrides: Vec<String>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Storage(String),
    Logging(String),
    TaskType(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
            ValidationError::TaskType(name, msg) => write!(f, "Task type '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EngineConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "Store path cannot be empty".to_string(),
            ));
        }

        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        let mut names: Vec<&String> = self.task_types.keys().collect();
        names.sort();
        for name in names {
            if name.trim().is_empty() {
                errors.push(ValidationError::TaskType(
                    name.clone(),
                    "task type name cannot be empty".to_string(),
                ));
                continue;
            }
            if let Err(e) = self.task_types[name].validate() {
                errors.push(ValidationError::TaskType(name.clone(), e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, then flatten errors into one `CompletionError`.
    pub fn ensure_valid(&self) -> Result<(), CompletionError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            CompletionError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    /// Completion registry with this config's task-type entries applied.
    pub fn completion_registry(&self) -> Result<CompletionRegistry, CompletionError> {
        CompletionRegistry::with_overrides(&self.task_types)
    }

    pub fn tool_registry(&self) -> ToolRegistry {
        ToolRegistry::builtin().with_allowed_overrides(self.tools.allowed_overrides.iter().cloned())
    }
}
