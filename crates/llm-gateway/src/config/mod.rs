//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, ServerConfig, TelemetryConfig};

use crate::Result;

/// Layer the discovered config file and the environment over `builder`
pub fn load_config(builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let mut builder = builder;

    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}

/// Layer a specific config file and the environment over `builder`
pub fn load_config_from_path(path: &std::path::Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, builder)?;
    env::load_from_env(builder)
}
