//! Configuration loading, CLI/env overrides and validation.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{apply_overrides, CliOverrides};
pub use loader::{load_config, load_or_default, ConfigError};
pub use types::*;
pub use validate::validate_config;
