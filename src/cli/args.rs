//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::catalog::{
    build_http_client, register_client, PasswordGrantProvider, StaticTokenProvider,
    TokenError, TokenProvider,
};
use crate::config::{read_config, Config, ConfigError, ConfigSource};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument combination.
    #[error("{0}")]
    InvalidArgs(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Configuration overrides in the form name=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// Format output as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Skip TLS certificate validation when talking to the catalog.
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Update APIs that already exist in the catalog instead of skipping them.
    #[arg(long = "update-existing", global = true)]
    pub update_existing: bool,

    /// Bearer token to authenticate with. Skips client registration.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Username for client registration and the password token grant.
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password matching --username.
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Enable verbose output.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    pub fn to_config_source(&self) -> ConfigSource {
        ConfigSource {
            config_file: self.config_file.clone(),
            overrides: self.config_overrides.clone(),
        }
    }

    /// Read configuration and apply the flag-level settings on top.
    pub fn load_config(&self) -> std::result::Result<Config, ConfigError> {
        let result = read_config(&self.to_config_source())?;
        for warning in &result.warnings {
            tracing::warn!("{}", warning);
        }
        let mut config = result.config;
        if self.insecure {
            config.network.verify_tls = false;
        }
        if self.update_existing {
            config.import.update_existing = true;
        }
        Ok(config)
    }

    /// Build the token provider selected by the credential flags.
    pub async fn token_provider(
        &self,
        config: &Config,
    ) -> std::result::Result<Box<dyn TokenProvider>, TokenError> {
        if let Some(token) = &self.token {
            return Ok(Box::new(StaticTokenProvider::new(token)));
        }
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(TokenError::InvalidCredentials(
                "supply either --token or both --username and --password".to_string(),
            ));
        };
        let http = build_http_client(&config.network)?;
        let credentials = register_client(&http, &config.catalog, username, password).await?;
        Ok(Box::new(PasswordGrantProvider::new(
            http,
            config.catalog.token_url.clone(),
            credentials,
            username.clone(),
            password.clone(),
        )))
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Helper for commands that write output to a file or stdout.
#[derive(Args, Debug, Default)]
pub struct OutputSink {
    /// Write output to this file instead of stdout.
    #[arg(id = "output_file", short = 'o', long = "output-file")]
    pub file: Option<PathBuf>,
}

impl OutputSink {
    /// Write a string value to the output.
    pub async fn write_str(&self, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, value).await?;
            }
            None => {
                tokio::io::stdout().write_all(value.as_bytes()).await?;
                tokio::io::stdout().write_all(b"\n").await?;
            }
        }
        Ok(())
    }

    /// Write a value to the output, optionally as JSON.
    pub async fn write<T: serde::Serialize>(&self, value: &T, json: bool) -> Result<()> {
        let output = if json {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_value(value)
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };
        self.write_str(&output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_override() {
        assert_eq!(
            parse_config_override("catalog.publisher_url=https://x").unwrap(),
            (
                "catalog.publisher_url".to_string(),
                "https://x".to_string()
            )
        );
        assert!(parse_config_override("nodelimiter").is_err());
    }

    #[test]
    fn test_flags_layer_over_config() {
        let args = GlobalArgs {
            insecure: true,
            update_existing: true,
            ..GlobalArgs::default()
        };
        let config = args.load_config().unwrap();
        assert!(!config.network.verify_tls);
        assert!(config.import.update_existing);
    }

    #[tokio::test]
    async fn test_token_provider_requires_credentials() {
        let args = GlobalArgs::default();
        let config = args.load_config().unwrap();
        assert!(args.token_provider(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_static_token_short_circuits_registration() {
        let args = GlobalArgs {
            token: Some("abc".to_string()),
            ..GlobalArgs::default()
        };
        let config = args.load_config().unwrap();
        let provider = args.token_provider(&config).await.unwrap();
        assert_eq!(provider.token("apim:api_view").await.unwrap(), "abc");
    }
}
