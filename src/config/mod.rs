//! Application configuration.

mod read_config;
mod types;

pub use read_config::{read_config, ConfigError, ConfigResult, ConfigSource};
pub use types::{CatalogConfig, Config, ExportConfig, ImportConfig, NetworkConfig};
