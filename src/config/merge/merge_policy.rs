//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Environment variable prefix; `GENCOMPLETE_STORAGE__STORE_PATH` sets `storage.store_path`.
pub const ENV_PREFIX: &str = "GENCOMPLETE";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let store_path = crate::config::default_store_path();
    Config::builder()
        .set_default("storage.store_path", store_path.to_string_lossy().to_string())?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}

/// Environment source, applied last so it overrides every file.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tools.allowed_overrides")
}
