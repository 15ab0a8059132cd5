//! Command-line interface for apiport.

pub mod args;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::bulk::BulkError;
use crate::catalog::{CatalogError, TokenError};
use crate::config::ConfigError;

pub use args::{ArgsError, GlobalArgs, OutputSink};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] ArgsError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Token acquisition error.
    #[error("{0}")]
    Token(#[from] TokenError),

    /// Catalog client construction error.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// Bulk run error.
    #[error("{0}")]
    Bulk(#[from] BulkError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// apiport - move API definitions between a catalog and zip archives.
#[derive(Parser, Debug)]
#[command(name = "apiport", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export a single API from the catalog into a zip archive.
    Export(commands::export::ExportArgs),

    /// Export every API listed in a CSV file (provider,name,version rows).
    #[command(name = "export-bulk")]
    ExportBulk(commands::export::ExportBulkArgs),

    /// Import a zip archive of APIs into the catalog.
    Import(commands::import::ImportArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let config = self.global.load_config()?;

        match self.command {
            Command::Export(command) => command.run(&config, &self.global).await?,
            Command::ExportBulk(command) => command.run(&config, &self.global).await?,
            Command::Import(command) => command.run(&config, &self.global).await?,
        }

        Ok(())
    }
}

/// Main entry point for the CLI.
pub async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli.run().await
}
