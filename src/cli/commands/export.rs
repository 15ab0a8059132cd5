//! Export CLI commands.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::bulk::{self, RunReport};
use crate::catalog::{ApiIdentity, CatalogClient, EXPORT_SCOPE};
use crate::cli::{GlobalArgs, OutputSink, Result};
use crate::config::Config;

#[derive(Serialize)]
struct ExportOutput {
    archive: String,
    #[serde(flatten)]
    report: RunReport,
}

// =============================================================================
// Single Export
// =============================================================================

/// Arguments for the export command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Provider of the API to export.
    #[arg(long)]
    pub provider: String,

    /// Name of the API to export.
    #[arg(long)]
    pub name: String,

    /// Version of the API to export.
    #[arg(long)]
    pub version: String,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ExportArgs {
    pub async fn run(self, config: &Config, global: &GlobalArgs) -> Result<()> {
        let api = ApiIdentity::new(self.provider, self.name, self.version);
        run_export(vec![api], config, global, &self.output).await
    }
}

// =============================================================================
// Bulk Export
// =============================================================================

/// Arguments for the export-bulk command.
#[derive(Args, Debug)]
pub struct ExportBulkArgs {
    /// CSV file listing APIs to export, one provider,name,version row each.
    pub api_list: PathBuf,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ExportBulkArgs {
    pub async fn run(self, config: &Config, global: &GlobalArgs) -> Result<()> {
        let identities = bulk::read_api_list(&self.api_list)?;
        run_export(identities, config, global, &self.output).await
    }
}

// =============================================================================
// Shared Run
// =============================================================================

async fn run_export(
    identities: Vec<ApiIdentity>,
    config: &Config,
    global: &GlobalArgs,
    output: &OutputSink,
) -> Result<()> {
    let provider = global.token_provider(config).await?;
    let token = provider.token(EXPORT_SCOPE).await?;
    let client = CatalogClient::new(&config.catalog, &config.network, token)?;

    let (report, archive) = bulk::run_export(&client, &identities, &config.export).await?;

    if global.json {
        output
            .write(
                &ExportOutput {
                    archive: archive.display().to_string(),
                    report,
                },
                true,
            )
            .await?;
    } else {
        output
            .write_str(&format!(
                "Export complete: {} exported, {} not found, {} failed -> {}",
                report.exported,
                report.not_found,
                report.failed,
                archive.display()
            ))
            .await?;
    }
    Ok(())
}
