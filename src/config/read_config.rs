//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format
//! configuration files, with support for individual `key=value` overrides
//! layered on top.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use configparser::ini::Ini;
use thiserror::Error;

use super::{CatalogConfig, Config, ExportConfig, ImportConfig, NetworkConfig};

// =============================================================================
// Constants - Default Values
// =============================================================================

const DEFAULT_PUBLISHER_URL: &str = "https://localhost:9443/api/am/publisher/v0.10";
const DEFAULT_TOKEN_URL: &str = "https://localhost:8243/token";
const DEFAULT_REGISTRATION_URL: &str =
    "https://localhost:9443/client-registration/v0.10/register";
const DEFAULT_CLIENT_NAME: &str = "apiport";
const DEFAULT_VERIFY_TLS: bool = true;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ARCHIVE_NAME: &str = "ExportedAPIs";
const DEFAULT_UPDATE_EXISTING: bool = false;

const ENV_CONFIG_FILE: &str = "APIPORT_CONFIG_FILE";
const DEFAULT_CONFIG_FILENAME: &str = ".apiportconfig";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid integer '{value}': {source}")]
    InvalidInteger {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist,
    /// error. If None, fall back to APIPORT_CONFIG_FILE, then
    /// ~/.apiportconfig.
    pub config_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "catalog.publisher_url", "import.update_existing".
    pub overrides: Vec<(String, String)>,
}

/// Result of reading configuration.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Warnings produced while resolving the config file.
    pub warnings: Vec<String>,
}

// =============================================================================
// Parsing Helpers
// =============================================================================

/// Parse a boolean value, keeping `default` when the key is absent.
fn parse_bool(ini: &Ini, section: &str, key: &str, default: bool) -> Result<bool> {
    match ini.get(section, key) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean {
                key: key.to_string(),
                value: v.to_string(),
            }),
        },
    }
}

/// Parse a duration given in whole seconds, keeping `default` when absent.
fn parse_secs(ini: &Ini, section: &str, key: &str, default: Duration) -> Result<Duration> {
    match ini.get(section, key) {
        None => Ok(default),
        Some(v) => {
            let secs: u64 = v.parse().map_err(|e| ConfigError::InvalidInteger {
                value: v.to_string(),
                source: e,
            })?;
            Ok(Duration::from_secs(secs))
        }
    }
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(source: &ConfigSource) -> Result<(Option<PathBuf>, Option<String>)> {
    // If explicit path provided, it must exist
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok((Some(path.clone()), None));
        }
        return Err(ConfigError::FileNotFound(path.clone()));
    }

    // Check environment variable
    if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok((Some(path), None));
        }
        // Warn but continue with defaults
        return Ok((
            None,
            Some(format!(
                "config file specified by {} does not exist: {}",
                ENV_CONFIG_FILE, env_path
            )),
        ));
    }

    // Check ~/.apiportconfig
    if let Some(home) = env::var_os("HOME").map(PathBuf::from) {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok((Some(default_path), None));
        }
    }

    Ok((None, None))
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
fn default_config() -> Config {
    Config {
        catalog: CatalogConfig {
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            registration_url: DEFAULT_REGISTRATION_URL.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        },
        network: NetworkConfig {
            verify_tls: DEFAULT_VERIFY_TLS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        },
        export: ExportConfig {
            destination: PathBuf::from("."),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        },
        import: ImportConfig {
            update_existing: DEFAULT_UPDATE_EXISTING,
        },
    }
}

// =============================================================================
// INI Parsing
// =============================================================================

/// Apply an INI file's contents to a Config, layering on top of existing values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    // [catalog] section
    if let Some(url) = ini.get("catalog", "publisher_url") {
        config.catalog.publisher_url = url;
    }
    if let Some(url) = ini.get("catalog", "token_url") {
        config.catalog.token_url = url;
    }
    if let Some(url) = ini.get("catalog", "registration_url") {
        config.catalog.registration_url = url;
    }
    if let Some(name) = ini.get("catalog", "client_name") {
        config.catalog.client_name = name;
    }

    // [network] section
    config.network.verify_tls =
        parse_bool(ini, "network", "verify_tls", config.network.verify_tls)?;
    config.network.connect_timeout = parse_secs(
        ini,
        "network",
        "connect_timeout_secs",
        config.network.connect_timeout,
    )?;
    config.network.request_timeout = parse_secs(
        ini,
        "network",
        "request_timeout_secs",
        config.network.request_timeout,
    )?;

    // [export] section
    if let Some(dest) = ini.get("export", "destination") {
        config.export.destination = PathBuf::from(dest);
    }
    if let Some(name) = ini.get("export", "archive_name") {
        config.export.archive_name = name;
    }

    // [import] section
    config.import.update_existing = parse_bool(
        ini,
        "import",
        "update_existing",
        config.import.update_existing,
    )?;

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Override Application
// =============================================================================

/// Apply a single key=value override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let invalid = |message: &str| ConfigError::InvalidOverrideKey {
        key: key.to_string(),
        message: message.to_string(),
    };

    match key {
        "catalog.publisher_url" => config.catalog.publisher_url = value.to_string(),
        "catalog.token_url" => config.catalog.token_url = value.to_string(),
        "catalog.registration_url" => config.catalog.registration_url = value.to_string(),
        "catalog.client_name" => config.catalog.client_name = value.to_string(),
        "network.verify_tls" => {
            config.network.verify_tls = parse_bool_str(key, value)?;
        }
        "network.connect_timeout_secs" => {
            config.network.connect_timeout = parse_secs_str(value)?;
        }
        "network.request_timeout_secs" => {
            config.network.request_timeout = parse_secs_str(value)?;
        }
        "export.destination" => config.export.destination = PathBuf::from(value),
        "export.archive_name" => config.export.archive_name = value.to_string(),
        "import.update_existing" => {
            config.import.update_existing = parse_bool_str(key, value)?;
        }
        _ => return Err(invalid("unknown configuration key")),
    }
    Ok(())
}

fn parse_bool_str(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_secs_str(value: &str) -> Result<Duration> {
    let secs: u64 = value.parse().map_err(|e| ConfigError::InvalidInteger {
        value: value.to_string(),
        source: e,
    })?;
    Ok(Duration::from_secs(secs))
}

// =============================================================================
// Entry Point
// =============================================================================

/// Read configuration: defaults, then the resolved config file, then
/// individual overrides.
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    let mut config = default_config();
    let mut warnings = Vec::new();

    let (path, warning) = resolve_config_file(source)?;
    if let Some(warning) = warning {
        warnings.push(warning);
    }
    if let Some(path) = path {
        let ini = load_ini(&path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    Ok(ConfigResult { config, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_config_file() {
        let result = read_config(&ConfigSource::default()).unwrap();
        let config = result.config;
        assert_eq!(config.catalog.publisher_url, DEFAULT_PUBLISHER_URL);
        assert!(config.network.verify_tls);
        assert_eq!(config.export.archive_name, "ExportedAPIs");
        assert!(!config.import.update_existing);
    }

    #[test]
    fn test_config_file_layers_over_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[catalog]\npublisher_url = https://apim.example.com/publisher\n\n\
             [network]\nverify_tls = false\nrequest_timeout_secs = 120\n\n\
             [import]\nupdate_existing = true\n"
        )
        .unwrap();

        let source = ConfigSource {
            config_file: Some(file.path().to_path_buf()),
            overrides: vec![],
        };
        let config = read_config(&source).unwrap().config;
        assert_eq!(
            config.catalog.publisher_url,
            "https://apim.example.com/publisher"
        );
        assert!(!config.network.verify_tls);
        assert_eq!(config.network.request_timeout, Duration::from_secs(120));
        // Untouched sections keep defaults.
        assert_eq!(config.catalog.token_url, DEFAULT_TOKEN_URL);
        assert!(config.import.update_existing);
    }

    #[test]
    fn test_overrides_apply_last() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[export]\narchive_name = FromFile\n").unwrap();

        let source = ConfigSource {
            config_file: Some(file.path().to_path_buf()),
            overrides: vec![(
                "export.archive_name".to_string(),
                "FromOverride".to_string(),
            )],
        };
        let config = read_config(&source).unwrap().config;
        assert_eq!(config.export.archive_name, "FromOverride");
    }

    #[test]
    fn test_unknown_override_key_rejected() {
        let source = ConfigSource {
            config_file: None,
            overrides: vec![("catalog.bogus".to_string(), "x".to_string())],
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::InvalidOverrideKey { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let source = ConfigSource {
            config_file: Some(PathBuf::from("/nonexistent/apiport.ini")),
            overrides: vec![],
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_boolean_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[network]\nverify_tls = maybe\n").unwrap();

        let source = ConfigSource {
            config_file: Some(file.path().to_path_buf()),
            overrides: vec![],
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::InvalidBoolean { .. })
        ));
    }
}
