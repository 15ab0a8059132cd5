//! Bulk runs: many APIs per invocation, one archive per run.
//!
//! The coordinator owns per-item failure isolation: a missing API, a
//! conflicting API, or a failing folder is tallied and the run keeps going.
//! Only archive-level problems (unreadable CSV, broken zip, staging I/O)
//! abort a run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::warn;

use crate::archive::layout::{self, MEDIATION_DIRECTORY};
use crate::archive::package::{self, PackageError};
use crate::catalog::{ApiIdentity, CatalogClient};
use crate::config::ExportConfig;
use crate::export::Exporter;
use crate::import::{Importer, ImportOutcome};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that abort a whole bulk run.
#[derive(Debug, Error)]
pub enum BulkError {
    /// The CSV list of APIs could not be read.
    #[error("failed to read API list {path}: {source}")]
    ApiList { path: PathBuf, source: csv::Error },

    /// A CSV row does not carry the three expected columns.
    #[error("row {row} of the API list is malformed: expected provider,name,version")]
    MalformedRow { row: usize },

    /// I/O error on the staging directory or destination.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip packaging failed.
    #[error("archive error: {0}")]
    Package(#[from] PackageError),
}

/// Result type for bulk operations.
pub type Result<T> = std::result::Result<T, BulkError>;

// =============================================================================
// Run Report
// =============================================================================

/// Aggregate outcome of one run. Item failures live here, not in the process
/// exit code.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    /// APIs written to the archive (export runs).
    pub exported: usize,
    /// APIs created in the catalog (import runs).
    pub created: usize,
    /// APIs updated in the catalog (import runs).
    pub updated: usize,
    /// APIs skipped because they already exist and updates are disabled.
    pub skipped: usize,
    /// APIs absent from the catalog (export runs).
    pub not_found: usize,
    /// APIs that failed outright.
    pub failed: usize,
}

impl RunReport {
    /// Total number of items this run looked at.
    pub fn total(&self) -> usize {
        self.exported + self.created + self.updated + self.skipped + self.not_found + self.failed
    }

    fn record_import(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Created => self.created += 1,
            ImportOutcome::Updated => self.updated += 1,
            ImportOutcome::Conflict => self.skipped += 1,
            ImportOutcome::Failed => self.failed += 1,
        }
    }
}

// =============================================================================
// API List (CSV)
// =============================================================================

/// Read a bulk export list: one `provider,name,version` row per API, no
/// header row.
pub fn read_api_list(path: &Path) -> Result<Vec<ApiIdentity>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| BulkError::ApiList {
            path: path.to_path_buf(),
            source,
        })?;

    let mut identities = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| BulkError::ApiList {
            path: path.to_path_buf(),
            source,
        })?;
        // Blank lines parse as a single empty field; skip them.
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let row = index + 1;
        let provider = record.get(0).filter(|s| !s.is_empty());
        let name = record.get(1).filter(|s| !s.is_empty());
        let version = record.get(2).filter(|s| !s.is_empty());
        match (provider, name, version) {
            (Some(provider), Some(name), Some(version)) => {
                identities.push(ApiIdentity::new(provider, name, version));
            }
            _ => return Err(BulkError::MalformedRow { row }),
        }
    }
    Ok(identities)
}

// =============================================================================
// Export Run
// =============================================================================

/// Export every listed API into one zip archive.
///
/// APIs are staged in a temporary directory that is removed once the zip is
/// written (or when the run aborts). Returns the report and the zip path.
pub async fn run_export(
    client: &CatalogClient,
    identities: &[ApiIdentity],
    export: &ExportConfig,
) -> Result<(RunReport, PathBuf)> {
    let staging = TempDir::new()?;
    let exporter = Exporter::new(client, staging.path());
    let mut report = RunReport::default();

    for api in identities {
        match exporter.export_one(api).await {
            Ok(()) => report.exported += 1,
            Err(e) if e.is_not_found() => {
                warn!("{}", e);
                report.not_found += 1;
            }
            Err(e) => {
                warn!("failed to export API {}: {}", api, e);
                report.failed += 1;
            }
        }
    }

    let destination = export
        .destination
        .join(format!("{}.zip", export.archive_name));
    package::zip_directory(staging.path(), &destination)?;

    Ok((report, destination))
}

// =============================================================================
// Import Run
// =============================================================================

/// Import every API folder contained in a zip archive.
///
/// The archive is unpacked once into a temporary root that is removed after
/// all folders are processed. The root-level global `mediation/` folder is
/// consumed through each API's sequences, never iterated as an API.
pub async fn run_import(
    client: &CatalogClient,
    zip_path: &Path,
    update_existing: bool,
) -> Result<RunReport> {
    let unpack_root = TempDir::new()?;
    package::unzip_to(zip_path, unpack_root.path())?;

    let importer = Importer::new(client, update_existing);
    let mut report = RunReport::default();

    for folder in api_folders(unpack_root.path())? {
        match importer.create_or_update(&folder).await {
            Ok(outcome) => report.record_import(outcome),
            Err(e) => {
                warn!("failed to process archived folder {}: {}", folder.display(), e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Immediate child folders of an unpacked archive that hold APIs, in a
/// deterministic order.
///
/// A folder counts as an API folder when its name parses back to a
/// `(name, version)` pair under the layout contract.
fn api_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name() == MEDIATION_DIRECTORY {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(layout::parse_api_folder) {
            Some(_) => folders.push(entry.path()),
            None => warn!(
                "skipping archive folder '{}': not a {{name}}-{{version}} API folder",
                name.to_string_lossy()
            ),
        }
    }
    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_api_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apis.csv");
        fs::write(&path, "acme,PetStore,1.0.0\nacme,Billing,2.1.0\n").unwrap();

        let list = read_api_list(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].catalog_id(), "acme-PetStore-1.0.0");
        assert_eq!(list[1].catalog_id(), "acme-Billing-2.1.0");
    }

    #[test]
    fn test_read_api_list_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apis.csv");
        fs::write(&path, "acme,PetStore,1.0.0\n\n").unwrap();

        let list = read_api_list(&path).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_read_api_list_rejects_short_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apis.csv");
        fs::write(&path, "acme,PetStore,1.0.0\nacme,NoVersion\n").unwrap();

        assert!(matches!(
            read_api_list(&path),
            Err(BulkError::MalformedRow { row: 2 })
        ));
    }

    #[test]
    fn test_api_folders_skip_global_mediation() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("PetStore-1.0.0")).unwrap();
        fs::create_dir_all(root.path().join("Billing-2.1.0")).unwrap();
        fs::create_dir_all(root.path().join("mediation/in")).unwrap();
        fs::create_dir_all(root.path().join("notanapifolder")).unwrap();
        fs::write(root.path().join("stray-file"), b"x").unwrap();

        let folders = api_folders(root.path()).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Billing-2.1.0", "PetStore-1.0.0"]);
    }

    #[test]
    fn test_report_tallies() {
        let mut report = RunReport::default();
        report.record_import(ImportOutcome::Created);
        report.record_import(ImportOutcome::Updated);
        report.record_import(ImportOutcome::Conflict);
        report.record_import(ImportOutcome::Failed);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 4);
    }
}
