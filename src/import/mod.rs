//! Import pipeline: archive → catalog.
//!
//! Each archived API folder is reconciled against the catalog with a
//! create-or-update state machine. Terminal states are [`ImportOutcome`]
//! values; a failing sub-resource replay never escalates to API failure, and
//! a failing API never aborts the batch driving it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::layout::{
    DOCS_DIRECTORY, FILE_CONTENTS_DIRECTORY, ICON_BASENAME, INLINE_CONTENTS_DIRECTORY,
    META_INFO_DIRECTORY,
};
use crate::catalog::{
    ApiDescriptor, ApiIdentity, CatalogClient, CatalogError, DocumentList, DocumentSourceType,
};
use crate::mediation::MediationSync;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that prevent an archived API folder from being processed at all.
#[derive(Debug, Error)]
pub enum ImportError {
    /// I/O error reading the archive folder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archived metadata could not be parsed.
    #[error("invalid api.json at {path}: {source}")]
    InvalidMetadata {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Terminal state of one API's reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The API did not exist and was created with all sub-resources.
    Created,
    /// The API existed and was overwritten, sub-resources included.
    Updated,
    /// The API exists and updates are disabled; skipped.
    Conflict,
    /// The catalog rejected the API; the batch moves on.
    Failed,
}

// =============================================================================
// Archive Folder Helpers
// =============================================================================

/// Path of the archived metadata inside an API folder.
fn metadata_path(api_folder: &Path) -> PathBuf {
    api_folder.join(META_INFO_DIRECTORY).join("api.json")
}

/// Path of a document's archived content inside an API folder.
fn document_content_path(
    api_folder: &Path,
    source_type: DocumentSourceType,
    name: &str,
) -> Option<PathBuf> {
    let subdir = match source_type {
        DocumentSourceType::File => FILE_CONTENTS_DIRECTORY,
        DocumentSourceType::Inline => INLINE_CONTENTS_DIRECTORY,
        _ => return None,
    };
    Some(api_folder.join(DOCS_DIRECTORY).join(subdir).join(name))
}

/// Path of the archived WSDL inside an API folder.
fn wsdl_path(api_folder: &Path, api: &ApiIdentity) -> PathBuf {
    api_folder.join(format!("{}-{}.wsdl", api.name, api.version))
}

/// Locate the archived thumbnail (`icon.<ext>`), whatever its extension.
async fn find_icon(api_folder: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(api_folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file()
            && path.file_stem().and_then(|s| s.to_str()) == Some(ICON_BASENAME)
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

// =============================================================================
// Importer
// =============================================================================

/// Reconciles archived API folders against the catalog.
pub struct Importer<'a> {
    client: &'a CatalogClient,
    update_existing: bool,
}

impl<'a> Importer<'a> {
    pub fn new(client: &'a CatalogClient, update_existing: bool) -> Self {
        Self {
            client,
            update_existing,
        }
    }

    /// Create the archived API, or update it when it already exists and
    /// updates are enabled.
    ///
    /// Returns the terminal state; `Err` only when the folder itself is
    /// unreadable or its metadata unparsable.
    pub async fn create_or_update(&self, api_folder: &Path) -> Result<ImportOutcome> {
        let path = metadata_path(api_folder);
        let content = tokio::fs::read_to_string(&path).await?;
        let descriptor: ApiDescriptor = serde_json::from_str(&content)
            .map_err(|source| ImportError::InvalidMetadata { path, source })?;
        let identity = descriptor.identity();
        let id = identity.catalog_id();

        // The archived payload still carries the uuid of the environment it
        // was exported from; the target catalog assigns its own.
        let mut payload = descriptor.clone();
        payload.id = None;

        match self.client.create_api(&payload).await {
            Ok(created) => {
                let Some(uuid) = created.id else {
                    warn!("catalog returned no uuid for created API {}", id);
                    return Ok(ImportOutcome::Failed);
                };
                info!("created API {}", id);
                self.replay_thumbnail(api_folder, &uuid).await;
                self.replay_documents(api_folder, &uuid).await;
                self.replay_mediation(&descriptor, api_folder, &uuid).await;
                self.replay_wsdl(api_folder, &identity, &uuid, false).await;
                Ok(ImportOutcome::Created)
            }
            Err(CatalogError::Conflict) if self.update_existing => {
                self.update_existing_api(&descriptor, api_folder).await
            }
            Err(CatalogError::Conflict) => {
                warn!("API {} already exists; updates disabled, skipping", id);
                Ok(ImportOutcome::Conflict)
            }
            Err(e) => {
                warn!("failed to create API {}: {}", id, e);
                Ok(ImportOutcome::Failed)
            }
        }
    }

    /// Update path: resolve the existing uuid by the identity id, overwrite
    /// the payload, then overwrite (not merge) every sub-resource.
    async fn update_existing_api(
        &self,
        descriptor: &ApiDescriptor,
        api_folder: &Path,
    ) -> Result<ImportOutcome> {
        let identity = descriptor.identity();
        let id = identity.catalog_id();

        let existing = match self.client.get_api(&id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("cannot resolve existing API {}: {}", id, e);
                return Ok(ImportOutcome::Failed);
            }
        };
        let Some(uuid) = existing.id else {
            warn!("existing API {} carries no uuid", id);
            return Ok(ImportOutcome::Failed);
        };

        let mut payload = descriptor.clone();
        payload.id = Some(uuid.clone());
        if let Err(e) = self.client.update_api(&uuid, &payload).await {
            warn!("failed to update API {}: {}", id, e);
            return Ok(ImportOutcome::Failed);
        }

        // The archived set replaces the remote set: existing documents are
        // removed before the archived ones are re-added.
        self.delete_remote_documents(&uuid).await;
        self.replay_documents(api_folder, &uuid).await;
        self.replay_thumbnail(api_folder, &uuid).await;
        self.replay_mediation(descriptor, api_folder, &uuid).await;
        self.replay_wsdl(api_folder, &identity, &uuid, true).await;

        info!("updated API {}", id);
        Ok(ImportOutcome::Updated)
    }

    async fn delete_remote_documents(&self, uuid: &str) {
        let existing = match self.client.list_documents(uuid).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("failed to list existing documents: {}", e);
                return;
            }
        };
        for document in existing.list {
            let Some(document_id) = document.document_id else {
                continue;
            };
            if let Err(e) = self.client.delete_document(uuid, &document_id).await {
                warn!(
                    "failed to delete existing document '{}': {}",
                    document.name, e
                );
            }
        }
    }

    async fn replay_thumbnail(&self, api_folder: &Path, uuid: &str) {
        let icon = match find_icon(api_folder).await {
            Ok(Some(icon)) => icon,
            Ok(None) => return,
            Err(e) => {
                warn!("failed to scan for archived thumbnail: {}", e);
                return;
            }
        };
        let file_name = icon
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.png", ICON_BASENAME));
        let bytes = match tokio::fs::read(&icon).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read archived thumbnail: {}", e);
                return;
            }
        };
        if let Err(e) = self.client.upload_thumbnail(uuid, file_name, bytes).await {
            warn!("failed to upload thumbnail: {}", e);
        }
    }

    async fn replay_documents(&self, api_folder: &Path, uuid: &str) {
        let summary_path = api_folder.join(DOCS_DIRECTORY).join("docs.json");
        let content = match tokio::fs::read_to_string(&summary_path).await {
            Ok(content) => content,
            Err(_) => {
                debug!("no archived documents at {}", summary_path.display());
                return;
            }
        };
        let summary: DocumentList = match serde_json::from_str(&content) {
            Ok(summary) => summary,
            Err(e) => {
                warn!("invalid docs.json at {}: {}", summary_path.display(), e);
                return;
            }
        };

        for document in summary.list {
            // The server assigns a fresh document id on create.
            let mut payload = document.clone();
            payload.document_id = None;

            let created = match self.client.create_document(uuid, &payload).await {
                Ok(created) => created,
                Err(e) => {
                    warn!("failed to create document '{}': {}", document.name, e);
                    continue;
                }
            };
            if !created.source_type.has_content() {
                continue;
            }
            let Some(document_id) = created.document_id.as_deref() else {
                warn!(
                    "catalog returned no id for document '{}'; content not uploaded",
                    created.name
                );
                continue;
            };
            let Some(content_path) =
                document_content_path(api_folder, created.source_type, &created.name)
            else {
                continue;
            };
            let bytes = match tokio::fs::read(&content_path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        "missing archived content for document '{}': {}",
                        created.name, e
                    );
                    continue;
                }
            };
            if let Err(e) = self
                .client
                .upload_document_content(uuid, document_id, created.name.clone(), bytes)
                .await
            {
                warn!(
                    "failed to upload content of document '{}': {}",
                    created.name, e
                );
            }
        }
    }

    async fn replay_mediation(&self, descriptor: &ApiDescriptor, api_folder: &Path, uuid: &str) {
        if descriptor.sequences.is_empty() {
            return;
        }
        // Shared policies were archived at the root, next to the API folders.
        let global_base = api_folder.parent().unwrap_or(api_folder);
        MediationSync::new(self.client)
            .import_policies(
                &descriptor.sequences,
                uuid,
                api_folder,
                global_base,
                self.update_existing,
            )
            .await;
    }

    async fn replay_wsdl(
        &self,
        api_folder: &Path,
        api: &ApiIdentity,
        uuid: &str,
        replace: bool,
    ) {
        let path = wsdl_path(api_folder, api);
        let wsdl = match tokio::fs::read(&path).await {
            Ok(wsdl) => wsdl,
            Err(_) => return,
        };
        let result = if replace {
            match self.client.update_wsdl(uuid, wsdl.clone()).await {
                // Nothing to replace yet; attach instead.
                Err(CatalogError::NotFound) => self.client.create_wsdl(uuid, wsdl).await,
                other => other,
            }
        } else {
            self.client.create_wsdl(uuid, wsdl).await
        };
        if let Err(e) = result {
            warn!("failed to replay WSDL of {}: {}", api.catalog_id(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_document_content_paths() {
        let folder = Path::new("PetStore-1.0.0");
        assert_eq!(
            document_content_path(folder, DocumentSourceType::File, "HowTo.pdf").unwrap(),
            PathBuf::from("PetStore-1.0.0/docs/FileContents/HowTo.pdf")
        );
        assert_eq!(
            document_content_path(folder, DocumentSourceType::Inline, "Notes").unwrap(),
            PathBuf::from("PetStore-1.0.0/docs/InlineContents/Notes")
        );
        assert!(document_content_path(folder, DocumentSourceType::Url, "x").is_none());
    }

    #[test]
    fn test_wsdl_path_from_identity() {
        let api = ApiIdentity::new("acme", "PetStore", "1.0.0");
        assert_eq!(
            wsdl_path(Path::new("PetStore-1.0.0"), &api),
            PathBuf::from("PetStore-1.0.0/PetStore-1.0.0.wsdl")
        );
    }

    #[tokio::test]
    async fn test_find_icon_any_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("icon.gif"), b"GIF89a").unwrap();
        fs::write(temp.path().join("other.png"), b"x").unwrap();

        let icon = find_icon(temp.path()).await.unwrap().unwrap();
        assert_eq!(icon.file_name().unwrap(), "icon.gif");
    }

    #[tokio::test]
    async fn test_find_icon_absent() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("api.json"), b"{}").unwrap();
        assert!(find_icon(temp.path()).await.unwrap().is_none());
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("PetStore-1.0.0")),
            PathBuf::from("PetStore-1.0.0/meta-information/api.json")
        );
    }
}
