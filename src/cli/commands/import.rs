//! Import CLI command.

use std::path::PathBuf;

use clap::Args;

use crate::bulk;
use crate::catalog::{CatalogClient, IMPORT_SCOPE};
use crate::cli::{GlobalArgs, OutputSink, Result};
use crate::config::Config;

/// Arguments for the import command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Zip archive of exported APIs.
    pub archive: PathBuf,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ImportArgs {
    pub async fn run(self, config: &Config, global: &GlobalArgs) -> Result<()> {
        let provider = global.token_provider(config).await?;
        let token = provider.token(IMPORT_SCOPE).await?;
        let client = CatalogClient::new(&config.catalog, &config.network, token)?;

        let report =
            bulk::run_import(&client, &self.archive, config.import.update_existing).await?;

        if global.json {
            self.output.write(&report, true).await?;
        } else {
            self.output
                .write_str(&format!(
                    "Import complete: {} created, {} updated, {} skipped, {} failed",
                    report.created, report.updated, report.skipped, report.failed
                ))
                .await?;
        }
        Ok(())
    }
}
