//! Configuration management
//!
//! Configuration is layered from built-in defaults, an optional file
//! (TOML, JSON or YAML), `PATCHBENCH_*` environment variables and command
//! line overrides, later sources winning.

pub mod defaults;
mod loader;
mod model;

pub use loader::{ConfigLoader, ConfigSource};
pub use model::{
    AppConfig, CatalogConfig, HarnessConfig, LogFormat, LoggingConfig, ServerConfig, SettleConfig,
};
