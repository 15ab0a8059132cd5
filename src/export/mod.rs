//! Export pipeline: catalog → archive.
//!
//! One API is exported start-to-finish: normalized metadata, swagger,
//! thumbnail, documents, mediation policies, WSDL. A failing sub-resource is
//! logged and skipped; only a failing metadata fetch aborts the API itself.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::layout::{self, Artifact};
use crate::catalog::{
    ApiDescriptor, ApiIdentity, CatalogClient, CatalogError, DocumentDescriptor,
    MediationScope,
};
use crate::mediation::MediationSync;

/// Status forced onto exported payloads so re-import lands in a publishable
/// state.
const STATUS_CREATED: &str = "CREATED";
/// The one original status that survives normalization.
const STATUS_PROTOTYPED: &str = "PROTOTYPED";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that abort the export of a single API.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The API does not exist in the catalog. Non-fatal for a bulk run.
    #[error("API {0} does not exist in the catalog")]
    NotFound(String),

    /// The metadata fetch failed for any other reason.
    #[error("failed to fetch API {id}: {source}")]
    Catalog { id: String, source: CatalogError },

    /// I/O error writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Whether this is the absent-API case, reported but never escalated.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExportError::NotFound(_))
    }
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

// =============================================================================
// Payload Normalization
// =============================================================================

/// Normalize a fetched payload before persisting it.
///
/// The status is forced to `CREATED` (unless the API was `PROTOTYPED`) and
/// the scope is cleared, so a later import cannot re-create the API in an
/// unpublishable or overly-privileged state.
pub fn normalize_for_export(descriptor: &mut ApiDescriptor) {
    let prototyped = descriptor
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case(STATUS_PROTOTYPED));
    if !prototyped {
        descriptor.status = Some(STATUS_CREATED.to_string());
    }
    descriptor.scope = None;
}

// =============================================================================
// Thumbnail Media Types
// =============================================================================

/// Map a thumbnail's media type to a file extension.
///
/// The declared `Content-Type` wins when it is one of the known image types;
/// otherwise the leading bytes are sniffed. Anything unrecognized yields
/// `None` and the thumbnail is skipped without error.
pub fn thumbnail_extension(content_type: Option<&str>, bytes: &[u8]) -> Option<&'static str> {
    if let Some(declared) = content_type {
        let media_type = declared.split(';').next().unwrap_or("").trim();
        match media_type {
            "image/png" => return Some("png"),
            "image/jpg" => return Some("jpg"),
            "image/jpeg" => return Some("jpeg"),
            "image/bmp" => return Some("bmp"),
            "image/gif" => return Some("gif"),
            _ => {}
        }
    }
    sniff_image_extension(bytes)
}

/// Identify an image format from its magic bytes.
fn sniff_image_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else {
        None
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

// =============================================================================
// Exporter
// =============================================================================

/// Exports one API at a time from the catalog into an archive root.
pub struct Exporter<'a> {
    client: &'a CatalogClient,
    root: PathBuf,
}

impl<'a> Exporter<'a> {
    /// Create an exporter writing below the given archive root.
    pub fn new(client: &'a CatalogClient, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    /// Export one API and all of its sub-resources.
    ///
    /// Metadata fetch failures abort this API; every later sub-resource
    /// failure is logged and skipped so the rest of the API still lands in
    /// the archive.
    pub async fn export_one(&self, api: &ApiIdentity) -> Result<()> {
        let id = api.catalog_id();
        let descriptor = self.client.get_api(&id).await.map_err(|e| match e {
            CatalogError::NotFound => ExportError::NotFound(id.clone()),
            source => ExportError::Catalog {
                id: id.clone(),
                source,
            },
        })?;

        let uuid = descriptor.id.clone();
        let mut normalized = descriptor;
        normalize_for_export(&mut normalized);

        // Metadata and swagger always land first; they define the API folder.
        self.write_artifact(
            api,
            &Artifact::Metadata,
            serde_json::to_string_pretty(&normalized)?.as_bytes(),
        )
        .await?;
        match &normalized.api_definition {
            Some(definition) => {
                self.write_artifact(api, &Artifact::Swagger, definition.as_bytes())
                    .await?;
            }
            None => debug!("API {} has no swagger definition", id),
        }

        let Some(uuid) = uuid else {
            warn!("API {} payload carries no uuid; skipping sub-resources", id);
            return Ok(());
        };

        if !is_blank(normalized.thumbnail_uri.as_deref()) {
            if let Err(e) = self.export_thumbnail(api, &uuid).await {
                warn!("failed to export thumbnail of {}: {}", id, e);
            }
        }

        if let Err(e) = self.export_documents(api, &uuid).await {
            warn!("failed to export documents of {}: {}", id, e);
        }

        self.export_mediation(api, &uuid, &normalized).await;

        if !is_blank(normalized.wsdl_uri.as_deref()) {
            if let Err(e) = self.export_wsdl(api, &uuid).await {
                warn!("failed to export WSDL of {}: {}", id, e);
            }
        }

        info!("exported API {}", id);
        Ok(())
    }

    async fn export_thumbnail(&self, api: &ApiIdentity, uuid: &str) -> Result<()> {
        let (bytes, content_type) = self
            .client
            .get_thumbnail(uuid)
            .await
            .map_err(|source| ExportError::Catalog {
                id: api.catalog_id(),
                source,
            })?;
        match thumbnail_extension(content_type.as_deref(), &bytes) {
            Some(extension) => {
                self.write_artifact(
                    api,
                    &Artifact::Thumbnail {
                        extension: extension.to_string(),
                    },
                    &bytes,
                )
                .await
            }
            None => {
                debug!(
                    "cannot determine thumbnail media type of {}; skipping",
                    api.catalog_id()
                );
                Ok(())
            }
        }
    }

    async fn export_documents(&self, api: &ApiIdentity, uuid: &str) -> Result<()> {
        let documents =
            self.client
                .list_documents(uuid)
                .await
                .map_err(|source| ExportError::Catalog {
                    id: api.catalog_id(),
                    source,
                })?;
        self.write_artifact(
            api,
            &Artifact::DocumentSummary,
            serde_json::to_string_pretty(&documents)?.as_bytes(),
        )
        .await?;

        for document in &documents.list {
            if !document.source_type.has_content() {
                continue;
            }
            if let Err(e) = self.export_document_content(api, uuid, document).await {
                warn!(
                    "failed to export content of document '{}' of {}: {}",
                    document.name,
                    api.catalog_id(),
                    e
                );
            }
        }
        Ok(())
    }

    async fn export_document_content(
        &self,
        api: &ApiIdentity,
        uuid: &str,
        document: &DocumentDescriptor,
    ) -> Result<()> {
        let Some(document_id) = document.document_id.as_deref() else {
            warn!("document '{}' has no id; skipping content", document.name);
            return Ok(());
        };
        let content = self
            .client
            .get_document_content(uuid, document_id)
            .await
            .map_err(|source| ExportError::Catalog {
                id: api.catalog_id(),
                source,
            })?;
        self.write_artifact(
            api,
            &Artifact::DocumentContent {
                source_type: document.source_type,
                name: document.name.clone(),
            },
            &content,
        )
        .await
    }

    async fn export_mediation(&self, api: &ApiIdentity, uuid: &str, payload: &ApiDescriptor) {
        let sync = MediationSync::new(self.client);
        let (shared, scoped): (Vec<_>, Vec<_>) =
            payload.sequences.iter().partition(|s| s.shared);

        let api_base = self.root.join(layout::api_folder(api));
        sync.export_policies(&scoped, MediationScope::Api(uuid), &api_base)
            .await;
        sync.export_policies(&shared, MediationScope::Global, &self.root)
            .await;
    }

    async fn export_wsdl(&self, api: &ApiIdentity, uuid: &str) -> Result<()> {
        let wsdl = self
            .client
            .get_wsdl(uuid)
            .await
            .map_err(|source| ExportError::Catalog {
                id: api.catalog_id(),
                source,
            })?;
        self.write_artifact(api, &Artifact::Wsdl, &wsdl).await
    }

    /// Write one artifact below the archive root, creating parents.
    async fn write_artifact(
        &self,
        api: &ApiIdentity,
        artifact: &Artifact,
        bytes: &[u8],
    ) -> Result<()> {
        let Some(relative) = layout::path_for(api, artifact) else {
            return Ok(());
        };
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn descriptor(status: Option<&str>, scope: Option<&str>) -> ApiDescriptor {
        ApiDescriptor {
            id: Some("uuid-123".to_string()),
            provider: "acme".to_string(),
            name: "PetStore".to_string(),
            version: "1.0.0".to_string(),
            status: status.map(String::from),
            scope: scope.map(String::from),
            thumbnail_uri: None,
            wsdl_uri: None,
            api_definition: None,
            sequences: Vec::new(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_normalize_forces_created_status() {
        let mut payload = descriptor(Some("PUBLISHED"), Some("apim:api_admin"));
        normalize_for_export(&mut payload);
        assert_eq!(payload.status.as_deref(), Some("CREATED"));
        assert!(payload.scope.is_none());
    }

    #[test]
    fn test_normalize_keeps_prototyped_status() {
        let mut payload = descriptor(Some("PROTOTYPED"), None);
        normalize_for_export(&mut payload);
        assert_eq!(payload.status.as_deref(), Some("PROTOTYPED"));
    }

    #[test]
    fn test_normalize_sets_status_when_absent() {
        let mut payload = descriptor(None, None);
        normalize_for_export(&mut payload);
        assert_eq!(payload.status.as_deref(), Some("CREATED"));
    }

    #[test]
    fn test_thumbnail_extension_prefers_declared_type() {
        // image/jpg is only reachable through the declared media type.
        assert_eq!(
            thumbnail_extension(Some("image/jpg"), &[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("jpg")
        );
        assert_eq!(
            thumbnail_extension(Some("image/png; charset=binary"), &[]),
            Some("png")
        );
    }

    #[test]
    fn test_thumbnail_extension_sniffs_magic_bytes() {
        assert_eq!(
            thumbnail_extension(None, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            Some("png")
        );
        assert_eq!(
            thumbnail_extension(Some("application/octet-stream"), b"GIF89a..."),
            Some("gif")
        );
        assert_eq!(thumbnail_extension(None, b"BM\x00\x00"), Some("bmp"));
        assert_eq!(
            thumbnail_extension(None, &[0xFF, 0xD8, 0xFF, 0xDB]),
            Some("jpeg")
        );
    }

    #[test]
    fn test_thumbnail_extension_unrecognized_is_none() {
        assert_eq!(thumbnail_extension(Some("image/webp"), b"RIFF....WEBP"), None);
        assert_eq!(thumbnail_extension(None, b"plain text"), None);
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("abc")));
    }
}
