//! Configuration loading and CLI definitions.
//!
//! Files may be JSON, YAML or TOML (picked by extension). Every field has a
//! default, so an absent file or section yields a runnable configuration.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_env, apply_env_with, apply_overrides};
pub use loader::{ConfigError, load_config, load_or_default};
pub use types::{
    Config, DirectoryConfig, LoggingConfig, MetricsConfig, ServerConfig, TunnelConfig,
};
pub use validate::validate_config;
